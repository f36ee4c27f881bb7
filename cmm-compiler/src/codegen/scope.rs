use super::types::{full_name, signature, ValueType};
use crate::{CodegenErrorKind, CompileError};
use indexmap::IndexMap;

/// Highest local index a JVM method can address.
pub const MAX_LOCALS: u32 = u16::MAX as u32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableSlot {
    pub name: String,
    pub ty: ValueType,
    pub index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionEntry {
    /// `name(<param descriptors>)`, the lookup key.
    pub signature: String,
    /// Signature plus return descriptor, used in `invokestatic`.
    pub full_name: String,
    pub return_type: ValueType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Symbol {
    Variable(VariableSlot),
    /// Metadata-only entry with no storage.
    Pseudo { name: String, ty: ValueType },
    Function(FunctionEntry),
}

#[derive(Debug, Clone, Default)]
struct Frame {
    symbols: IndexMap<String, Symbol>,
    next_index: u32,
}

impl Frame {
    fn starting_at(next_index: u32) -> Self {
        Self {
            symbols: IndexMap::new(),
            next_index,
        }
    }
}

#[derive(Debug, Clone)]
struct FunctionScope {
    return_type: ValueType,
    /// Number of frames below the function's body frame.
    base_depth: usize,
    peak_slots: u32,
}

/// Stack of lexical frames plus the enclosing-function context.
#[derive(Debug, Clone)]
pub struct ScopeTable {
    frames: Vec<Frame>,
    functions: Vec<FunctionScope>,
}

impl Default for ScopeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTable {
    /// A table holding only the (empty) global frame.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::default()],
            functions: Vec::new(),
        }
    }

    /// A table whose global frame is seeded with the runtime built-ins.
    pub fn with_builtins() -> Self {
        let mut table = Self::new();
        let s = ValueType::String;
        let n = ValueType::Number;
        let b = ValueType::Boolean;
        for name in ["print", "println"] {
            for ty in [b, n, s] {
                table.declare_builtin(name, &[ty], ty);
            }
        }
        table.declare_builtin("cos", &[n], n);
        table.declare_builtin("sin", &[n], n);
        table.declare_builtin("pow", &[n, n], n);
        table.declare_builtin("concat", &[s, s], s);
        table.declare_builtin("concat", &[s, b], s);
        table.declare_builtin("concat", &[b, s], s);
        table
    }

    fn declare_builtin(&mut self, name: &str, params: &[ValueType], ret: ValueType) {
        let sig = signature(name, params);
        let full = full_name(&sig, ret);
        self.declare_function(sig, full, ret);
    }

    // ── Frame lifecycle ─────────────────────────────────────────────────

    /// Enter a nested block; its slots continue after the parent's.
    pub fn push_block(&mut self) {
        let next = self.current().next_index;
        self.frames.push(Frame::starting_at(next));
    }

    pub fn pop_block(&mut self) {
        debug_assert!(self.frames.len() > 1, "popping the global frame");
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Enter a function body; locals restart at 0.
    pub fn push_function(&mut self, return_type: ValueType) {
        self.functions.push(FunctionScope {
            return_type,
            base_depth: self.frames.len(),
            peak_slots: 0,
        });
        self.frames.push(Frame::starting_at(0));
    }

    /// Leave a function body, returning the number of local slots it used.
    pub fn pop_function(&mut self) -> u32 {
        let Some(func) = self.functions.pop() else {
            debug_assert!(false, "pop_function without push_function");
            return 0;
        };
        self.frames.truncate(func.base_depth.max(1));
        func.peak_slots
    }

    // ── Declarations ────────────────────────────────────────────────────

    /// Bind `name` to the next free slot of the current frame.
    ///
    /// Re-declaring in the same frame replaces the previous entry.
    pub fn declare_variable(&mut self, name: &str, ty: ValueType) -> Result<VariableSlot, CompileError> {
        let index = self.allocate_slot()?;
        let slot = VariableSlot {
            name: name.to_string(),
            ty,
            index,
        };
        self.current_mut()
            .symbols
            .insert(name.to_string(), Symbol::Variable(slot.clone()));
        Ok(slot)
    }

    /// Reserve an anonymous slot in the current frame.
    pub fn declare_scratch(&mut self) -> Result<u16, CompileError> {
        self.allocate_slot()
    }

    pub fn declare_pseudo(&mut self, name: &str, ty: ValueType) {
        self.current_mut().symbols.insert(
            name.to_string(),
            Symbol::Pseudo {
                name: name.to_string(),
                ty,
            },
        );
    }

    pub fn declare_function(
        &mut self,
        signature: String,
        full_name: String,
        return_type: ValueType,
    ) {
        let entry = FunctionEntry {
            signature: signature.clone(),
            full_name,
            return_type,
        };
        self.current_mut()
            .symbols
            .insert(signature, Symbol::Function(entry));
    }

    fn allocate_slot(&mut self) -> Result<u16, CompileError> {
        let frame = self.current_mut();
        if frame.next_index >= MAX_LOCALS {
            return Err(CompileError::codegen(
                CodegenErrorKind::StorageExhausted,
                format!("more than {} local slots", MAX_LOCALS),
            ));
        }
        let index = frame.next_index;
        frame.next_index += 1;
        if let Some(func) = self.functions.last_mut() {
            func.peak_slots = func.peak_slots.max(index + 1);
        }
        Ok(index as u16)
    }

    // ── Lookup ──────────────────────────────────────────────────────────

    /// Find a name, innermost frame first.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.frames.iter().rev().find_map(|f| f.symbols.get(name))
    }

    /// Like [`lookup`](Self::lookup), also reporting whether the name was
    /// found in a frame enclosing the function being lowered. Slots in such
    /// frames belong to another method's locals.
    pub fn lookup_from_function(&self, name: &str) -> Option<(&Symbol, bool)> {
        let base = self.functions.last().map_or(0, |f| f.base_depth);
        self.frames
            .iter()
            .enumerate()
            .rev()
            .find_map(|(depth, f)| f.symbols.get(name).map(|s| (s, depth < base)))
    }

    pub fn lookup_function(&self, signature: &str) -> Option<&FunctionEntry> {
        match self.lookup(signature) {
            Some(Symbol::Function(entry)) => Some(entry),
            _ => None,
        }
    }

    /// Declared return type of the function whose body is being lowered.
    pub fn current_return_type(&self) -> Option<ValueType> {
        self.functions.last().map(|f| f.return_type)
    }

    fn current(&self) -> &Frame {
        // The global frame is never popped.
        &self.frames[self.frames.len() - 1]
    }

    fn current_mut(&mut self) -> &mut Frame {
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(table: &ScopeTable, name: &str) -> VariableSlot {
        match table.lookup(name) {
            Some(Symbol::Variable(v)) => v.clone(),
            other => panic!("expected variable {name}, got {:?}", other),
        }
    }

    #[test]
    fn indices_are_dense_and_monotonic() {
        let mut t = ScopeTable::new();
        t.push_function(ValueType::Number);
        let a = t.declare_variable("a", ValueType::Number).unwrap();
        let b = t.declare_variable("b", ValueType::String).unwrap();
        assert_eq!((a.index, b.index), (0, 1));
    }

    #[test]
    fn nested_block_continues_after_parent_and_shadows() {
        let mut t = ScopeTable::new();
        t.push_function(ValueType::Number);
        t.declare_variable("x", ValueType::Number).unwrap();
        t.push_block();
        let inner = t.declare_variable("x", ValueType::String).unwrap();
        assert_eq!(inner.index, 1);
        assert_eq!(slot(&t, "x").ty, ValueType::String);
        t.pop_block();
        let outer = slot(&t, "x");
        assert_eq!((outer.index, outer.ty), (0, ValueType::Number));
    }

    #[test]
    fn sibling_blocks_do_not_reuse_past_parent_count() {
        let mut t = ScopeTable::new();
        t.push_function(ValueType::Number);
        t.declare_variable("p", ValueType::Number).unwrap();
        t.push_block();
        assert_eq!(t.declare_variable("a", ValueType::Number).unwrap().index, 1);
        t.pop_block();
        t.push_block();
        assert_eq!(t.declare_variable("b", ValueType::Number).unwrap().index, 1);
        t.pop_block();
        assert_eq!(t.pop_function(), 2);
    }

    #[test]
    fn redeclaring_in_same_frame_overwrites() {
        let mut t = ScopeTable::new();
        t.push_function(ValueType::Number);
        t.declare_variable("x", ValueType::Number).unwrap();
        t.declare_variable("x", ValueType::Boolean).unwrap();
        let x = slot(&t, "x");
        assert_eq!((x.index, x.ty), (1, ValueType::Boolean));
    }

    #[test]
    fn function_frame_restarts_at_zero() {
        let mut t = ScopeTable::new();
        t.declare_variable("g", ValueType::Number).unwrap();
        t.push_function(ValueType::String);
        assert_eq!(t.declare_variable("p", ValueType::Number).unwrap().index, 0);
        assert_eq!(t.current_return_type(), Some(ValueType::String));
        t.pop_function();
        assert_eq!(t.current_return_type(), None);
        assert!(t.lookup("p").is_none());
        assert_eq!(slot(&t, "g").index, 0);
    }

    #[test]
    fn enclosing_frames_are_flagged_from_inside_a_function() {
        let mut t = ScopeTable::new();
        t.declare_variable("g", ValueType::Number).unwrap();
        assert!(matches!(t.lookup_from_function("g"), Some((_, false))));
        t.push_function(ValueType::Number);
        t.declare_variable("p", ValueType::Number).unwrap();
        t.push_block();
        t.declare_variable("local", ValueType::Number).unwrap();
        assert!(matches!(t.lookup_from_function("g"), Some((_, true))));
        assert!(matches!(t.lookup_from_function("p"), Some((_, false))));
        assert!(matches!(t.lookup_from_function("local"), Some((_, false))));
        assert!(t.lookup_from_function("missing").is_none());
    }

    #[test]
    fn builtins_support_overloads() {
        let t = ScopeTable::with_builtins();
        let f = t.lookup_function("print(F)").unwrap();
        assert_eq!(f.full_name, "print(F)F");
        let s = t.lookup_function("println(Ljava/lang/String;)").unwrap();
        assert_eq!(s.return_type, ValueType::String);
        assert!(t.lookup_function("concat(ILjava/lang/String;)").is_some());
        assert!(t.lookup_function("print()").is_none());
    }

    #[test]
    fn pseudo_entries_carry_metadata_without_storage() {
        let mut t = ScopeTable::new();
        t.push_function(ValueType::Number);
        t.declare_pseudo("marker", ValueType::Boolean);
        let next = t.declare_variable("x", ValueType::Number).unwrap();
        assert_eq!(next.index, 0);
        assert!(matches!(
            t.lookup("marker"),
            Some(Symbol::Pseudo { ty: ValueType::Boolean, .. })
        ));
    }

    #[test]
    fn scratch_slots_advance_the_frame() {
        let mut t = ScopeTable::new();
        t.push_function(ValueType::Number);
        assert_eq!(t.declare_scratch().unwrap(), 0);
        assert_eq!(t.declare_variable("x", ValueType::Number).unwrap().index, 1);
    }
}
