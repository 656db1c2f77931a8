use super::ast::{ArraySize, ParamSig, Type};

/// Signature of one runtime-library routine.  The table below is the
/// single source of truth: the semantic analyzer seeds the global scope
/// from it and the IR emitter declares the matching externs, so the two
/// phases can never disagree about a builtin.
pub struct LibraryFn {
    pub name: &'static str,
    pub params: Vec<ParamSig>,
    pub ret: Type,
}

fn val(name: &str, ty: Type) -> ParamSig {
    ParamSig {
        name: name.into(),
        ty,
        by_ref: false,
    }
}

fn string_ref(name: &str) -> ParamSig {
    ParamSig {
        name: name.into(),
        ty: Type::array(Type::Char, ArraySize::Open),
        by_ref: true,
    }
}

/// The builtin I/O and string routines every Mica program may call.
/// They are externals provided by the runtime library and receive no
/// access link.
pub fn library_functions() -> Vec<LibraryFn> {
    vec![
        LibraryFn {
            name: "writeInteger",
            params: vec![val("n", Type::Int)],
            ret: Type::Proc,
        },
        LibraryFn {
            name: "writeChar",
            params: vec![val("c", Type::Char)],
            ret: Type::Proc,
        },
        LibraryFn {
            name: "writeString",
            params: vec![string_ref("s")],
            ret: Type::Proc,
        },
        LibraryFn {
            name: "readInteger",
            params: vec![],
            ret: Type::Int,
        },
        LibraryFn {
            name: "readChar",
            params: vec![],
            ret: Type::Char,
        },
        LibraryFn {
            name: "readString",
            params: vec![val("n", Type::Int), string_ref("s")],
            ret: Type::Proc,
        },
        LibraryFn {
            name: "ascii",
            params: vec![val("c", Type::Char)],
            ret: Type::Int,
        },
        LibraryFn {
            name: "chr",
            params: vec![val("n", Type::Int)],
            ret: Type::Char,
        },
        LibraryFn {
            name: "strlen",
            params: vec![string_ref("s")],
            ret: Type::Int,
        },
        LibraryFn {
            name: "strcmp",
            params: vec![string_ref("s1"), string_ref("s2")],
            ret: Type::Int,
        },
        LibraryFn {
            name: "strcpy",
            params: vec![string_ref("trg"), string_ref("src")],
            ret: Type::Proc,
        },
        LibraryFn {
            name: "strcat",
            params: vec![string_ref("trg"), string_ref("src")],
            ret: Type::Proc,
        },
    ]
}
