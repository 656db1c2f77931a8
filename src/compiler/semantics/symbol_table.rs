use log::debug;

use crate::compiler::ast::{ParamSig, Type};

/**
The symbol table is a forest of scopes.  Each scope is owned by a
function (or by the synthetic global scope named `root` which holds the
library functions and the top-level procedure) and records the entries
declared directly inside it.

Closed scopes are not discarded: `close_scope` only moves the cursor
back to the parent, so entry handles stay valid for the whole
compilation and a scope's path to the root can be rebuilt at any time
(this is what the label mangling walks).
*/
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
    current: usize,
}

#[derive(Debug)]
pub struct Scope {
    name: String,
    parent: Option<usize>,
    depth: u32,
    entries: Vec<Entry>,
}

/// Handle to an entry: scope index and position within the scope.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntryId(usize, usize);

#[derive(Debug)]
pub struct Entry {
    pub name: String,
    pub kind: EntryKind,
}

#[derive(Debug)]
pub enum EntryKind {
    Variable {
        ty: Type,
    },
    Parameter {
        ty: Type,
        passing: Passing,
    },
    Function {
        params: Vec<ParamSig>,
        ret: Type,
        state: DefState,
        library: bool,
    },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Passing {
    ByValue,
    ByReference,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum DefState {
    Declared,
    Defined,
}

impl SymbolTable {
    /// Creates a table holding only the global scope (`root`, depth 0).
    pub fn new() -> SymbolTable {
        SymbolTable {
            scopes: vec![Scope {
                name: "root".into(),
                parent: None,
                depth: 0,
                entries: Vec::new(),
            }],
            current: 0,
        }
    }

    /// Opens a child scope of the current one, named after the owning
    /// function, and makes it current.
    pub fn open_scope(&mut self, name: &str) {
        let depth = self.scopes[self.current].depth + 1;
        debug!("Open scope {} at depth {}", name, depth);
        self.scopes.push(Scope {
            name: name.into(),
            parent: Some(self.current),
            depth,
            entries: Vec::new(),
        });
        self.current = self.scopes.len() - 1;
    }

    /// Moves the cursor back to the parent scope.  The closed scope stays
    /// in the forest.
    pub fn close_scope(&mut self) {
        self.current = self.scopes[self.current]
            .parent
            .expect("Cannot close the root scope");
    }

    /// Depth of the current scope; 0 means the global scope.
    pub fn depth(&self) -> u32 {
        self.scopes[self.current].depth
    }

    pub fn entry(&self, id: EntryId) -> &Entry {
        &self.scopes[id.0].entries[id.1]
    }

    /// Depth of the scope an entry was declared in.  For a function
    /// entry this is its nesting level: 0 for the top-level procedure
    /// and the library routines, 1 for functions local to the top level,
    /// and so on.
    pub fn depth_of(&self, id: EntryId) -> u32 {
        self.scopes[id.0].depth
    }

    fn push_entry(&mut self, name: &str, kind: EntryKind) -> EntryId {
        let scope = self.current;
        self.scopes[scope].entries.push(Entry {
            name: name.into(),
            kind,
        });
        EntryId(scope, self.scopes[scope].entries.len() - 1)
    }

    pub fn enter_variable(&mut self, name: &str, ty: Type) -> EntryId {
        self.push_entry(name, EntryKind::Variable { ty })
    }

    pub fn enter_parameter(&mut self, name: &str, ty: Type, passing: Passing) -> EntryId {
        self.push_entry(name, EntryKind::Parameter { ty, passing })
    }

    pub fn enter_function(
        &mut self,
        name: &str,
        params: Vec<ParamSig>,
        ret: Type,
        state: DefState,
        library: bool,
    ) -> EntryId {
        self.push_entry(
            name,
            EntryKind::Function {
                params,
                ret,
                state,
                library,
            },
        )
    }

    /// Marks a declared function entry as defined.
    pub fn set_func_defined(&mut self, id: EntryId) {
        match &mut self.scopes[id.0].entries[id.1].kind {
            EntryKind::Function { state, .. } => *state = DefState::Defined,
            other => panic!("Expected a function entry, found {:?}", other),
        }
    }

    /// Finds the innermost declaration of `name`, walking from the
    /// current scope out to the root.
    pub fn lookup(&self, name: &str) -> Option<EntryId> {
        let mut scope = self.current;
        loop {
            if let Some(id) = self.lookup_in(scope, name) {
                return Some(id);
            }
            scope = self.scopes[scope].parent?;
        }
    }

    /// Finds `name` in the current scope only.
    pub fn lookup_current(&self, name: &str) -> Option<EntryId> {
        self.lookup_in(self.current, name)
    }

    fn lookup_in(&self, scope: usize, name: &str) -> Option<EntryId> {
        self.scopes[scope]
            .entries
            .iter()
            .position(|e| e.name == name)
            .map(|i| EntryId(scope, i))
    }

    /// Every function visible from the current scope whose state is
    /// still `Declared`.
    pub fn undefined_functions(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut scope = Some(self.current);
        while let Some(s) = scope {
            for e in &self.scopes[s].entries {
                if let EntryKind::Function {
                    state: DefState::Declared,
                    ..
                } = e.kind
                {
                    out.push(e.name.clone());
                }
            }
            scope = self.scopes[s].parent;
        }
        out
    }

    /// The mangled label of a function entry: the underscore-joined
    /// scope names from the global scope down to the entry's scope, then
    /// the function's own name (`root_main_q`).  Library functions keep
    /// their raw name.
    pub fn label_of(&self, id: EntryId) -> String {
        if let EntryKind::Function { library: true, .. } = self.entry(id).kind {
            return self.entry(id).name.clone();
        }
        let mut names = vec![self.entry(id).name.as_str()];
        let mut scope = Some(id.0);
        while let Some(s) = scope {
            names.push(self.scopes[s].name.as_str());
            scope = self.scopes[s].parent;
        }
        names.reverse();
        names.join("_")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_out_to_the_root() {
        let mut st = SymbolTable::new();
        st.enter_variable("x", Type::Int);
        st.open_scope("f");
        st.enter_variable("y", Type::Char);

        let x = st.lookup("x").expect("x should be visible");
        assert!(matches!(st.entry(x).kind, EntryKind::Variable { ty: Type::Int }));
        assert!(st.lookup("y").is_some());
        assert!(st.lookup("z").is_none());
    }

    #[test]
    fn inner_declaration_shadows_outer() {
        let mut st = SymbolTable::new();
        st.enter_variable("x", Type::Int);
        st.open_scope("f");
        st.enter_variable("x", Type::Char);

        let x = st.lookup("x").unwrap();
        assert!(matches!(st.entry(x).kind, EntryKind::Variable { ty: Type::Char }));

        st.close_scope();
        let x = st.lookup("x").unwrap();
        assert!(matches!(st.entry(x).kind, EntryKind::Variable { ty: Type::Int }));
    }

    #[test]
    fn lookup_current_ignores_parents() {
        let mut st = SymbolTable::new();
        st.enter_variable("x", Type::Int);
        st.open_scope("f");
        assert!(st.lookup_current("x").is_none());
    }

    #[test]
    fn depth_tracks_nesting() {
        let mut st = SymbolTable::new();
        assert_eq!(st.depth(), 0);
        st.open_scope("f");
        assert_eq!(st.depth(), 1);
        st.open_scope("g");
        assert_eq!(st.depth(), 2);
        st.close_scope();
        assert_eq!(st.depth(), 1);
    }

    #[test]
    fn function_state_transitions() {
        let mut st = SymbolTable::new();
        let f = st.enter_function("f", vec![], Type::Proc, DefState::Declared, false);
        assert_eq!(st.undefined_functions(), vec!["f".to_string()]);

        st.set_func_defined(f);
        assert!(st.undefined_functions().is_empty());
    }

    #[test]
    fn entries_survive_scope_close() {
        let mut st = SymbolTable::new();
        st.open_scope("f");
        let y = st.enter_variable("y", Type::Int);
        st.close_scope();
        assert_eq!(st.entry(y).name, "y");
        assert!(st.lookup("y").is_none());
    }

    #[test]
    fn labels_join_the_scope_path() {
        let mut st = SymbolTable::new();
        let main = st.enter_function("main", vec![], Type::Proc, DefState::Defined, false);
        st.open_scope("main");
        let q = st.enter_function("q", vec![], Type::Proc, DefState::Defined, false);
        st.open_scope("q");
        let r = st.enter_function("r", vec![], Type::Int, DefState::Defined, false);

        assert_eq!(st.label_of(main), "root_main");
        assert_eq!(st.label_of(q), "root_main_q");
        assert_eq!(st.label_of(r), "root_main_q_r");
    }

    #[test]
    fn library_functions_keep_raw_names() {
        let mut st = SymbolTable::new();
        let w = st.enter_function("writeInteger", vec![], Type::Proc, DefState::Defined, true);
        assert_eq!(st.label_of(w), "writeInteger");
    }
}
