//! Call frames

use crate::object::Closure;
use std::rc::Rc;

/// Execution record for one active invocation
#[derive(Debug)]
pub struct Frame {
    /// The closure being executed; shared read-only with the constant pool
    pub closure: Rc<Closure>,
    /// Next byte to decode within the closure's instructions
    pub ip: usize,
    /// Stack position where this call's arguments and locals begin
    pub base_pointer: usize,
}

impl Frame {
    pub fn new(closure: Rc<Closure>, base_pointer: usize) -> Self {
        Frame {
            closure,
            ip: 0,
            base_pointer,
        }
    }

    pub fn instructions(&self) -> &[u8] {
        &self.closure.func.instructions
    }
}
