mod local;

pub use local::LocalService;
