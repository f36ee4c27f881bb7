use super::instruction::{AsmItem, JvmInstr};
use super::limits::LimitStrategy;
use super::scope::ScopeTable;
use super::types::ValueType;
use super::CodegenOptions;
use crate::ast::TypeName;
use crate::{CodegenErrorKind, CompileError};

/// Code generator state: output buffer, scope stack and label counter.
pub struct Gen {
    pub(crate) out: Vec<AsmItem>,
    pub(crate) scopes: ScopeTable,
    pub(crate) label_count: usize,
    pub(crate) base_name: String,
    pub(crate) limits: LimitStrategy,
}

impl Gen {
    pub fn new(options: &CodegenOptions) -> Self {
        Self {
            out: Vec::new(),
            scopes: ScopeTable::with_builtins(),
            label_count: 0,
            base_name: options.base_name.clone(),
            limits: options.limits,
        }
    }

    pub fn finish(self) -> Vec<AsmItem> {
        self.out
    }

    /// Items emitted so far.
    pub fn items(&self) -> &[AsmItem] {
        &self.out
    }

    pub fn take_items(&mut self) -> Vec<AsmItem> {
        std::mem::take(&mut self.out)
    }

    pub fn scopes_mut(&mut self) -> &mut ScopeTable {
        &mut self.scopes
    }

    pub fn new_label(&mut self) -> String {
        let l = format!("label{}", self.label_count);
        self.label_count += 1;
        log::trace!("allocated {l}");
        l
    }

    pub fn emit(&mut self, i: JvmInstr) {
        self.out.push(AsmItem::Instr(i));
    }

    pub fn emit_label(&mut self, label: String) {
        self.out.push(AsmItem::Label(label));
    }

    pub fn emit_item(&mut self, item: AsmItem) {
        self.out.push(item);
    }

    /// Run `f` with output redirected to a fresh buffer; returns the result
    /// together with what `f` emitted. The main buffer is left untouched.
    pub fn with_buffer<F, R>(&mut self, f: F) -> Result<(R, Vec<AsmItem>), CompileError>
    where
        F: FnOnce(&mut Self) -> Result<R, CompileError>,
    {
        let saved = std::mem::take(&mut self.out);
        let result = f(self);
        let buffer = std::mem::replace(&mut self.out, saved);
        result.map(|r| (r, buffer))
    }

    pub fn resolve_type(&self, name: &TypeName) -> Result<ValueType, CompileError> {
        ValueType::from_type_name(name.as_str()).ok_or_else(|| {
            self.make_error(
                CodegenErrorKind::InternalDispatch,
                format!("Internal error: unknown type name '{}'", name.as_str()),
            )
        })
    }

    /// `invokestatic` of a registered function, looked up by signature.
    pub fn builtin_call(&self, name: &str, params: &[ValueType]) -> Result<JvmInstr, CompileError> {
        let sig = super::types::signature(name, params);
        let entry = self.scopes.lookup_function(&sig).ok_or_else(|| {
            self.make_error(
                CodegenErrorKind::UnknownFunction,
                format!("Attempt to call non-existent function: {sig}"),
            )
        })?;
        Ok(JvmInstr::invoke_static(
            &self.base_name,
            &entry.full_name,
            params.len(),
        ))
    }

    pub fn make_error(&self, kind: CodegenErrorKind, message: String) -> CompileError {
        CompileError::codegen(kind, message)
    }
}
