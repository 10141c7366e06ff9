pub mod camera;
pub mod net;

pub use camera::CameraSmoother;
pub use net::{ClientConfig, Frame, InputState, JoinRequest, NetworkClient};
