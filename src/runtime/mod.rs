mod channel;
mod error;
mod interpreter;
mod legacy;
mod value;

pub use channel::{Channels, Received};
pub use error::Error;
pub use interpreter::{interpret, Interpreter, Options};
pub use value::{Num, Value};
