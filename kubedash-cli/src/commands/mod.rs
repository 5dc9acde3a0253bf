pub mod doctor;
pub mod init;

pub use doctor::run_doctor;
pub use init::run_init;
