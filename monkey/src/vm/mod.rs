//! Stack-based virtual machine
//!
//! Decode-dispatch loop over the current frame's instructions. The value
//! stack is shared across frames and partitioned by base pointers; globals
//! live in a flat slot array indexed by the compiler's global indices.
//! Out-of-range constant, global, local and builtin indices are compiler
//! bugs, not runtime errors, and are allowed to panic.

mod frame;
#[cfg(test)]
mod tests;

pub use frame::Frame;

use crate::code::{self, Opcode};
use crate::compiler::Bytecode;
use crate::error::RuntimeError;
use crate::object::{Builtin, Closure, CompiledFunction, HashKey, HashPair, Object};
use std::collections::HashMap;
use std::rc::Rc;

/// Value stack capacity
pub const STACK_SIZE: usize = 2048;
/// Global slot count
pub const GLOBALS_SIZE: usize = 65536;
/// Call depth limit
pub const MAX_FRAMES: usize = 1024;

/// The virtual machine
pub struct VM {
    constants: Vec<Object>,
    stack: Vec<Object>,
    /// Index of the next free stack slot
    sp: usize,
    globals: Vec<Object>,
    frames: Vec<Frame>,
}

impl VM {
    pub fn new(bytecode: Bytecode) -> Self {
        VM::with_globals(bytecode, vec![Object::Null; GLOBALS_SIZE])
    }

    /// Reuse a globals array from a previous run, so that REPL lines share
    /// bindings
    pub fn with_globals(bytecode: Bytecode, globals: Vec<Object>) -> Self {
        let main_function = CompiledFunction {
            instructions: bytecode.instructions,
            num_locals: 0,
            num_parameters: 0,
        };
        let main_closure = Closure {
            func: Rc::new(main_function),
            free: Vec::new(),
        };

        VM {
            constants: bytecode.constants,
            stack: vec![Object::Null; STACK_SIZE],
            sp: 0,
            globals,
            frames: vec![Frame::new(Rc::new(main_closure), 0)],
        }
    }

    /// Take the globals back for the next REPL line
    pub fn into_globals(self) -> Vec<Object> {
        self.globals
    }

    /// The value most recently discarded by `OpPop`
    ///
    /// After a completed program the stack is empty and this is the value
    /// of the last top-level expression statement.
    pub fn last_popped(&self) -> &Object {
        &self.stack[self.sp]
    }

    /// Execute until the main frame's instructions are exhausted
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        loop {
            let frame = match self.frames.last_mut() {
                Some(frame) => frame,
                None => break,
            };
            if frame.ip >= frame.instructions().len() {
                break;
            }

            let byte = frame.instructions()[frame.ip];
            frame.ip += 1;
            let op = Opcode::try_from(byte).map_err(RuntimeError::bad_opcode)?;

            match op {
                Opcode::Constant => {
                    let index = self.read_u16_operand();
                    let constant = self.constants[index].clone();
                    self.push(constant)?;
                }
                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div => {
                    self.execute_binary_operation(op)?;
                }
                Opcode::Equal | Opcode::NotEqual | Opcode::GreaterThan => {
                    self.execute_comparison(op)?;
                }
                Opcode::Minus => {
                    let operand = self.pop();
                    match operand {
                        Object::Integer(value) => self.push(Object::Integer(-value))?,
                        other => {
                            return Err(RuntimeError::unknown_prefix_operator(
                                "-",
                                other.type_name(),
                            ))
                        }
                    }
                }
                Opcode::Bang => {
                    let operand = self.pop();
                    self.push(Object::Boolean(!operand.is_truthy()))?;
                }
                Opcode::True => self.push(Object::Boolean(true))?,
                Opcode::False => self.push(Object::Boolean(false))?,
                Opcode::Null => self.push(Object::Null)?,
                Opcode::Pop => {
                    self.pop();
                }
                Opcode::Jump => {
                    let target = self.read_u16_operand();
                    self.current_frame().ip = target;
                }
                Opcode::JumpNotTruthy => {
                    let target = self.read_u16_operand();
                    let condition = self.pop();
                    if !condition.is_truthy() {
                        self.current_frame().ip = target;
                    }
                }
                Opcode::SetGlobal => {
                    let index = self.read_u16_operand();
                    let value = self.pop();
                    self.globals[index] = value;
                }
                Opcode::GetGlobal => {
                    let index = self.read_u16_operand();
                    let value = self.globals[index].clone();
                    self.push(value)?;
                }
                Opcode::SetLocal => {
                    let index = self.read_u8_operand();
                    let value = self.pop();
                    let base = self.current_frame().base_pointer;
                    self.stack[base + index] = value;
                }
                Opcode::GetLocal => {
                    let index = self.read_u8_operand();
                    let base = self.current_frame().base_pointer;
                    let value = self.stack[base + index].clone();
                    self.push(value)?;
                }
                Opcode::GetBuiltin => {
                    let index = self.read_u8_operand();
                    self.push(Object::Builtin(&crate::object::BUILTINS[index]))?;
                }
                Opcode::Array => {
                    let count = self.read_u16_operand();
                    let elements = self.stack[self.sp - count..self.sp].to_vec();
                    self.sp -= count;
                    self.push(Object::Array(Rc::new(elements)))?;
                }
                Opcode::Hash => {
                    let count = self.read_u16_operand();
                    let hash = self.build_hash(self.sp - count, self.sp)?;
                    self.sp -= count;
                    self.push(hash)?;
                }
                Opcode::Index => {
                    let index = self.pop();
                    let left = self.pop();
                    self.execute_index_expression(left, index)?;
                }
                Opcode::Call => {
                    let num_args = self.read_u8_operand();
                    self.execute_call(num_args)?;
                }
                Opcode::ReturnValue => {
                    let value = self.pop();
                    self.return_from_frame(value)?;
                }
                Opcode::ReturnNothing => {
                    self.return_from_frame(Object::Null)?;
                }
                Opcode::Closure => {
                    let const_index = self.read_u16_operand();
                    let free_count = self.read_u8_operand();
                    self.push_closure(const_index, free_count)?;
                }
                Opcode::GetFree => {
                    let index = self.read_u8_operand();
                    let value = self.current_frame().closure.free[index].clone();
                    self.push(value)?;
                }
                Opcode::CurrentClosure => {
                    let closure = Rc::clone(&self.current_frame().closure);
                    self.push(Object::Closure(closure))?;
                }
            }
        }

        Ok(())
    }

    fn current_frame(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("no active frame")
    }

    /// Decode a u16 operand at the instruction pointer and step past it
    fn read_u16_operand(&mut self) -> usize {
        let frame = self.current_frame();
        let operand = code::read_u16(&frame.closure.func.instructions[frame.ip..]);
        frame.ip += 2;
        operand
    }

    fn read_u8_operand(&mut self) -> usize {
        let frame = self.current_frame();
        let operand = code::read_u8(&frame.closure.func.instructions[frame.ip..]);
        frame.ip += 1;
        operand
    }

    fn push(&mut self, object: Object) -> Result<(), RuntimeError> {
        if self.sp >= STACK_SIZE {
            return Err(RuntimeError::stack_overflow());
        }
        self.stack[self.sp] = object;
        self.sp += 1;
        Ok(())
    }

    /// The popped slot is left in place so `last_popped` can observe it
    fn pop(&mut self) -> Object {
        self.sp -= 1;
        self.stack[self.sp].clone()
    }

    fn execute_binary_operation(&mut self, op: Opcode) -> Result<(), RuntimeError> {
        let right = self.pop();
        let left = self.pop();

        match (&left, &right) {
            (Object::Integer(left), Object::Integer(right)) => {
                self.execute_integer_binary_operation(op, *left, *right)
            }
            (Object::Str(left), Object::Str(right)) => {
                if op == Opcode::Add {
                    let concatenated = format!("{left}{right}");
                    self.push(Object::Str(Rc::new(concatenated)))
                } else {
                    Err(RuntimeError::unknown_infix_operator(
                        "STRING",
                        operator_symbol(op),
                        "STRING",
                    ))
                }
            }
            _ if left.type_name() != right.type_name() => Err(RuntimeError::type_mismatch(
                left.type_name(),
                operator_symbol(op),
                right.type_name(),
            )),
            _ => Err(RuntimeError::unknown_infix_operator(
                left.type_name(),
                operator_symbol(op),
                right.type_name(),
            )),
        }
    }

    fn execute_integer_binary_operation(
        &mut self,
        op: Opcode,
        left: i64,
        right: i64,
    ) -> Result<(), RuntimeError> {
        let result = match op {
            Opcode::Add => left + right,
            Opcode::Sub => left - right,
            Opcode::Mul => left * right,
            Opcode::Div => {
                if right == 0 {
                    return Err(RuntimeError::division_by_zero());
                }
                left / right
            }
            _ => unreachable!("not a binary arithmetic opcode: {op:?}"),
        };
        self.push(Object::Integer(result))
    }

    fn execute_comparison(&mut self, op: Opcode) -> Result<(), RuntimeError> {
        let right = self.pop();
        let left = self.pop();

        match op {
            // Integers compare by value; everything else by identity, which
            // is sound because booleans and null are canonical.
            Opcode::Equal => self.push(Object::Boolean(left.is_identical(&right))),
            Opcode::NotEqual => self.push(Object::Boolean(!left.is_identical(&right))),
            Opcode::GreaterThan => match (&left, &right) {
                (Object::Integer(left), Object::Integer(right)) => {
                    self.push(Object::Boolean(left > right))
                }
                _ if left.type_name() != right.type_name() => Err(RuntimeError::type_mismatch(
                    left.type_name(),
                    ">",
                    right.type_name(),
                )),
                _ => Err(RuntimeError::unknown_infix_operator(
                    left.type_name(),
                    ">",
                    right.type_name(),
                )),
            },
            _ => unreachable!("not a comparison opcode: {op:?}"),
        }
    }

    fn build_hash(&self, start: usize, end: usize) -> Result<Object, RuntimeError> {
        let mut pairs = HashMap::new();

        for slot in (start..end).step_by(2) {
            let key = self.stack[slot].clone();
            let value = self.stack[slot + 1].clone();

            let hash_key: HashKey = key
                .hash_key()
                .ok_or_else(|| RuntimeError::unusable_hash_key(key.type_name()))?;
            pairs.insert(hash_key, HashPair { key, value });
        }

        Ok(Object::Hash(Rc::new(pairs)))
    }

    fn execute_index_expression(
        &mut self,
        left: Object,
        index: Object,
    ) -> Result<(), RuntimeError> {
        match (&left, &index) {
            (Object::Array(elements), Object::Integer(position)) => {
                let element = if *position < 0 || *position as usize >= elements.len() {
                    Object::Null
                } else {
                    elements[*position as usize].clone()
                };
                self.push(element)
            }
            (Object::Hash(pairs), _) => {
                let hash_key = index
                    .hash_key()
                    .ok_or_else(|| RuntimeError::unusable_hash_key(index.type_name()))?;
                let value = pairs
                    .get(&hash_key)
                    .map(|pair| pair.value.clone())
                    .unwrap_or(Object::Null);
                self.push(value)
            }
            _ => Err(RuntimeError::index_not_supported(left.type_name())),
        }
    }

    fn execute_call(&mut self, num_args: usize) -> Result<(), RuntimeError> {
        let callee = self.stack[self.sp - 1 - num_args].clone();
        match callee {
            Object::Closure(closure) => self.call_closure(closure, num_args),
            Object::Builtin(builtin) => self.call_builtin(builtin, num_args),
            other => Err(RuntimeError::not_a_function(other.type_name())),
        }
    }

    fn call_closure(
        &mut self,
        closure: Rc<Closure>,
        num_args: usize,
    ) -> Result<(), RuntimeError> {
        if num_args != closure.func.num_parameters {
            return Err(RuntimeError::wrong_arity(
                closure.func.num_parameters,
                num_args,
            ));
        }
        if self.frames.len() >= MAX_FRAMES {
            return Err(RuntimeError::frame_overflow());
        }

        let base_pointer = self.sp - num_args;
        let frame_top = base_pointer + closure.func.num_locals;
        if frame_top > STACK_SIZE {
            return Err(RuntimeError::stack_overflow());
        }

        self.frames.push(Frame::new(closure, base_pointer));
        // Arguments already sit in the first local slots; the remaining
        // locals are reserved above them.
        self.sp = frame_top;
        Ok(())
    }

    fn call_builtin(
        &mut self,
        builtin: &'static Builtin,
        num_args: usize,
    ) -> Result<(), RuntimeError> {
        let args = self.stack[self.sp - num_args..self.sp].to_vec();
        let result = (builtin.func)(&args);
        self.sp -= num_args + 1;

        match result {
            Object::Error(message) => Err(RuntimeError::builtin(message)),
            object => self.push(object),
        }
    }

    fn return_from_frame(&mut self, value: Object) -> Result<(), RuntimeError> {
        let frame = self.frames.pop().expect("return with no active frame");

        if self.frames.is_empty() {
            // A top-level return ends the program; expose the value the way
            // a popped expression result would be.
            self.stack[0] = value;
            self.sp = 0;
            return Ok(());
        }

        // Drop the callee and its arguments/locals, then push the result.
        self.sp = frame.base_pointer - 1;
        self.push(value)
    }

    fn push_closure(
        &mut self,
        const_index: usize,
        free_count: usize,
    ) -> Result<(), RuntimeError> {
        let constant = self.constants[const_index].clone();
        let function = match constant {
            Object::CompiledFunction(function) => function,
            other => return Err(RuntimeError::not_a_function(other.type_name())),
        };

        let free = self.stack[self.sp - free_count..self.sp].to_vec();
        self.sp -= free_count;

        self.push(Object::Closure(Rc::new(Closure {
            func: function,
            free,
        })))
    }
}

fn operator_symbol(op: Opcode) -> &'static str {
    match op {
        Opcode::Add => "+",
        Opcode::Sub => "-",
        Opcode::Mul => "*",
        Opcode::Div => "/",
        Opcode::GreaterThan => ">",
        Opcode::Equal => "==",
        Opcode::NotEqual => "!=",
        _ => "?",
    }
}
