//
// transport.rs
//

use crate::error::Result;

/// The injected byte/token sink (§6). Called synchronously from `send`;
/// an `Err` returned here propagates straight back to the caller of
/// `send`.
pub trait Transport {
    fn write(&mut self, token: &str) -> Result<()>;
}
