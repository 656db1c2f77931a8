use log::debug;

use crate::compiler::ast::{FuncId, LocalDef, Program, Type};

/**
The layout of one function's activation record.

Every function gets an LLVM struct type named `frame_<label>`.  Slot 0
of a nested function's frame is the access link, a pointer to the frame
of the immediately enclosing activation; the root procedure has no
link.  The remaining slots hold the parameters in source order followed
by the local variables in source order, one slot per identifier.

Scalar by-value slots hold the value itself.  By-reference parameter
slots hold a pointer to the caller's storage.  Array slots always hold a
pointer to the first scalar element: for array parameters that is the
caller's pointer, for local arrays it points at backing storage the
prologue allocates separately.
*/
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Name of the LLVM struct type for this frame.
    pub struct_name: String,
    pub has_access_link: bool,
    /// One record per named slot (the access link is anonymous).
    pub records: Vec<VarRecord>,
    /// Number of records that are parameters; the rest are locals.
    pub param_count: usize,
    /// Total slot count, access link included.
    pub len: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct VarRecord {
    pub name: String,
    /// Slot index within the frame struct.
    pub index: u32,
    /// The slot holds a pointer to storage owned elsewhere.
    pub is_ref: bool,
    /// The slot holds an array base pointer.
    pub is_array: bool,
    /// Source-level type of the variable or parameter.
    pub ty: Type,
}

impl Frame {
    pub fn lookup(&self, name: &str) -> Option<&VarRecord> {
        self.records.iter().find(|r| r.name == name)
    }
}

/// Installs a [`Frame`] on every function definition.  Must run after
/// semantic analysis (it reads the mangled labels) and before IR
/// emission.  The walk is root-down so a frame's parent always exists
/// by the time a nested function needs it.
pub fn plan_frames(prog: &mut Program) {
    let root = prog.root;
    plan_func(prog, root);
}

fn plan_func(prog: &mut Program, f: FuncId) {
    let func = prog.func(f);
    let label = func
        .header
        .label
        .as_ref()
        .expect("frame planning requires an analyzed program");
    let has_access_link = func.parent.is_some();

    let mut records = Vec::new();
    let mut next_slot = if has_access_link { 1 } else { 0 };

    let params = func.header.expand_params();
    for p in &params {
        records.push(VarRecord {
            name: p.name.clone(),
            index: next_slot,
            is_ref: p.by_ref || p.ty.is_array(),
            is_array: p.ty.is_array(),
            ty: p.ty.clone(),
        });
        next_slot += 1;
    }

    for def in &func.local_defs {
        if let LocalDef::Var(var) = def {
            for name in &var.names {
                records.push(VarRecord {
                    name: name.clone(),
                    index: next_slot,
                    is_ref: false,
                    is_array: var.ty.is_array(),
                    ty: var.ty.clone(),
                });
                next_slot += 1;
            }
        }
    }

    let frame = Frame {
        struct_name: format!("frame_{}", label),
        has_access_link,
        records,
        param_count: params.len(),
        len: next_slot,
    };
    debug!(
        "Planned {} with {} slots (access link: {})",
        frame.struct_name, frame.len, frame.has_access_link
    );
    prog.func_mut(f).frame = Some(frame);

    let nested: Vec<FuncId> = prog
        .func(f)
        .local_defs
        .iter()
        .filter_map(|d| match d {
            LocalDef::Func(id) => Some(*id),
            _ => None,
        })
        .collect();
    for id in nested {
        plan_func(prog, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::parser::Parser;
    use crate::compiler::semantics::analyzer::analyze;
    use crate::compiler::Lexer;

    fn planned(text: &str) -> Program {
        let tokens = Lexer::new(text).tokenize().unwrap();
        let mut prog = Parser::parse(&tokens).unwrap();
        analyze(&mut prog).unwrap();
        plan_frames(&mut prog);
        prog
    }

    #[test]
    fn root_frame_has_no_access_link() {
        let prog = planned(
            "main () : proc
               var x : int;
               var c : char;
             {}",
        );
        let frame = prog.func(prog.root).frame.as_ref().unwrap();
        assert!(!frame.has_access_link);
        assert_eq!(frame.struct_name, "frame_root_main");
        assert_eq!(frame.len, 2);
        assert_eq!(frame.lookup("x").unwrap().index, 0);
        assert_eq!(frame.lookup("c").unwrap().index, 1);
    }

    #[test]
    fn nested_frame_reserves_slot_zero_for_the_link() {
        let prog = planned(
            "main () : proc
               f (a : int; b : ref int) : proc
                 var y : int;
               {}
             {}",
        );
        let f = match &prog.func(prog.root).local_defs[0] {
            crate::compiler::ast::LocalDef::Func(id) => *id,
            other => panic!("Expected nested def, got {:?}", other),
        };
        let frame = prog.func(f).frame.as_ref().unwrap();
        assert!(frame.has_access_link);
        assert_eq!(frame.len, 4);
        assert_eq!(frame.param_count, 2);

        let a = frame.lookup("a").unwrap();
        assert_eq!((a.index, a.is_ref, a.is_array), (1, false, false));
        let b = frame.lookup("b").unwrap();
        assert_eq!((b.index, b.is_ref, b.is_array), (2, true, false));
        let y = frame.lookup("y").unwrap();
        assert_eq!((y.index, y.is_ref, y.is_array), (3, false, false));
    }

    #[test]
    fn slots_are_contiguous_and_in_source_order() {
        let prog = planned(
            "main () : proc
               var a, b : int;
               var m : int[2][2];
               var c : char;
             {}",
        );
        let frame = prog.func(prog.root).frame.as_ref().unwrap();
        let indices: Vec<u32> = frame.records.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        let names: Vec<&str> = frame.records.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "m", "c"]);
        assert!(frame.lookup("m").unwrap().is_array);
    }

    #[test]
    fn array_parameters_are_reference_slots() {
        let prog = planned(
            "main () : proc
               f (s : char[]; m : int[4][2]) : proc {}
             {}",
        );
        let f = match &prog.func(prog.root).local_defs[0] {
            crate::compiler::ast::LocalDef::Func(id) => *id,
            other => panic!("Expected nested def, got {:?}", other),
        };
        let frame = prog.func(f).frame.as_ref().unwrap();
        let s = frame.lookup("s").unwrap();
        assert!(s.is_ref && s.is_array);
        let m = frame.lookup("m").unwrap();
        assert!(m.is_ref && m.is_array);
    }
}
