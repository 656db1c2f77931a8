use crate::compiler::ast::Type;

/// Errors generated during semantic analysis of a compilation unit.
/// Every error is fatal: the analyzer stops at the first one and the
/// driver never reaches IR emission.
#[derive(Clone, Debug, PartialEq)]
pub struct SemanticError {
    line: u32,
    kind: SemanticErrorKind,
}

impl SemanticError {
    pub fn new(line: u32, kind: SemanticErrorKind) -> SemanticError {
        SemanticError { line, kind }
    }

    pub fn zero_array_dim(line: u32, name: &str) -> SemanticError {
        SemanticError::new(line, SemanticErrorKind::ZeroArrayDim(name.into()))
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn kind(&self) -> &SemanticErrorKind {
        &self.kind
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum SemanticErrorKind {
    Undefined(String),
    DuplicateParameter(String, String),
    DuplicateVariable(String),
    VariableParameterCollision(String),
    VariableFunctionCollision(String),
    FunctionNameTaken(String),
    DeclaredNotDefined(String),
    Redefinition(String),
    MainBadReturnType(Type),
    MainHasParameters,
    Overloaded(String),
    DeclReturnMismatch(String, Type, Type),
    DeclParameterMismatch(String, String),
    WrongArgCount(String, usize, usize),
    ArgTypeMismatch(String, usize, Type, Type),
    RefArgNotLValue(String, usize),
    NotAFunction(String),
    NotAVariable(String),
    ArithOperandNotInt(Type),
    SignOperandNotInt(Type),
    CompareMismatch(Type, Type),
    AssignMismatch(Type, Type),
    AssignToArray(Type),
    AssignToFunction(String),
    AssignToStringLiteral,
    IndexNotInt(Type),
    IndexNonArray(Type),
    IndexOutOfBounds(i64, u32),
    ZeroArrayDim(String),
    IfArmMismatch(Type, Type),
    BodyReturnMismatch(String, Type, Type),
}

impl std::fmt::Display for SemanticError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use SemanticErrorKind::*;
        let msg = match &self.kind {
            Undefined(name) => format!("{} is not defined in this scope", name),
            DuplicateParameter(param, func) => {
                format!("Parameter {} appears twice in the header of {}", param, func)
            }
            DuplicateVariable(name) => format!("{} is declared more than once", name),
            VariableParameterCollision(name) => {
                format!("Local variable {} collides with a parameter of the same name", name)
            }
            VariableFunctionCollision(name) => {
                format!("Local variable {} collides with a function of the same name", name)
            }
            FunctionNameTaken(name) => {
                format!("{} is already declared and is not a function", name)
            }
            DeclaredNotDefined(name) => {
                format!("Function {} is declared but never defined", name)
            }
            Redefinition(name) => format!("Function {} is defined more than once", name),
            MainBadReturnType(ty) => format!(
                "The top-level procedure must return proc, but returns {}",
                ty
            ),
            MainHasParameters => "The top-level procedure must take no parameters".into(),
            Overloaded(name) => format!(
                "Declarations of {} disagree on the number of parameters; overloading is not supported",
                name
            ),
            DeclReturnMismatch(name, expected, actual) => format!(
                "Function {} was declared to return {} but this header returns {}",
                name, expected, actual
            ),
            DeclParameterMismatch(name, param) => format!(
                "Parameter {} of {} differs in type or passing mode from the earlier declaration",
                param, name
            ),
            WrongArgCount(name, expected, actual) => format!(
                "{} expects {} arguments but was given {}",
                name, expected, actual
            ),
            ArgTypeMismatch(name, index, expected, actual) => format!(
                "Argument {} of {} expects {} but got {}",
                index + 1,
                name,
                expected,
                actual
            ),
            RefArgNotLValue(name, index) => format!(
                "Argument {} of {} is passed by reference and must be an l-value",
                index + 1,
                name
            ),
            NotAFunction(name) => format!("{} is not a function", name),
            NotAVariable(name) => format!("{} is not a variable", name),
            ArithOperandNotInt(ty) => {
                format!("Arithmetic expects int operands, but found {}", ty)
            }
            SignOperandNotInt(ty) => format!("Unary sign expects an int operand, but found {}", ty),
            CompareMismatch(l, r) => {
                format!("Comparison operands must have the same scalar type, but found {} and {}", l, r)
            }
            AssignMismatch(l, r) => format!("Cannot assign {} to an l-value of type {}", r, l),
            AssignToArray(ty) => format!("Cannot assign to an array ({})", ty),
            AssignToFunction(name) => format!("Cannot assign to the function {}", name),
            AssignToStringLiteral => "Cannot assign into a string literal".into(),
            IndexNotInt(ty) => format!("Array index must be int, but found {}", ty),
            IndexNonArray(ty) => format!("Cannot index a value of type {}", ty),
            IndexOutOfBounds(value, size) => format!(
                "Index {} is out of bounds for an array of size {}",
                value, size
            ),
            ZeroArrayDim(name) => format!("Array {} is declared with a zero dimension", name),
            IfArmMismatch(t, e) => format!(
                "The branches of this if/else return different types: {} and {}",
                t, e
            ),
            BodyReturnMismatch(name, expected, actual) => format!(
                "The body of {} produces {} but the header declares {}",
                name, actual, expected
            ),
        };
        f.write_fmt(format_args!("L{}: {}", self.line, msg))
    }
}
