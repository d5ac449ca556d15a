pub mod diagnosis;
pub mod enums;
pub mod glycemic;
pub mod note;
pub mod sample;
pub mod summary;
pub mod user;

pub use diagnosis::*;
pub use enums::*;
pub use glycemic::*;
pub use note::*;
pub use sample::*;
pub use summary::*;
pub use user::*;
