// cdecl.rs — Abstract C declarations and statements
//
// The emission contract: resolved logic is never rendered as literal text,
// only as these structured descriptors. A separate renderer (outside this
// crate) turns a `SourceUnit` sequence into source files. Everything here
// serializes, so two resolutions of the same model can be compared
// structurally for byte-identical emission.

use serde::Serialize;

// ── Types ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CType {
    Void,
    Named(String),
    Pointer(Box<CType>),
    ConstPointer(Box<CType>),
}

impl CType {
    pub fn named(name: impl Into<String>) -> Self {
        CType::Named(name.into())
    }

    pub fn pointer_to(name: impl Into<String>) -> Self {
        CType::Pointer(Box::new(CType::Named(name.into())))
    }

    pub fn const_pointer_to(name: impl Into<String>) -> Self {
        CType::ConstPointer(Box::new(CType::Named(name.into())))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CParam {
    pub name: String,
    pub ty: CType,
}

impl CParam {
    pub fn new(name: impl Into<String>, ty: CType) -> Self {
        CParam {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FnSignature {
    pub name: String,
    pub ret: CType,
    pub params: Vec<CParam>,
}

// ── Expressions ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CBinOp {
    Eq,
    Ne,
    And,
    BitAnd,
    BitOr,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CExpr {
    Ident(String),
    Int(i64),
    Deref(Box<CExpr>),
    AddrOf(Box<CExpr>),
    SizeOf(String),
    Call { name: String, args: Vec<CExpr> },
    Bin { op: CBinOp, lhs: Box<CExpr>, rhs: Box<CExpr> },
    /// Brace initializer, used for configuration-table rows.
    InitList(Vec<CExpr>),
}

impl CExpr {
    pub fn ident(name: impl Into<String>) -> Self {
        CExpr::Ident(name.into())
    }

    pub fn call(name: impl Into<String>, args: Vec<CExpr>) -> Self {
        CExpr::Call {
            name: name.into(),
            args,
        }
    }

    pub fn bin(op: CBinOp, lhs: CExpr, rhs: CExpr) -> Self {
        CExpr::Bin {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn deref(inner: CExpr) -> Self {
        CExpr::Deref(Box::new(inner))
    }

    pub fn addr_of(inner: CExpr) -> Self {
        CExpr::AddrOf(Box::new(inner))
    }

    /// OR-fold a non-empty list of expressions, left-associated.
    pub fn fold_bit_or(mut exprs: Vec<CExpr>) -> CExpr {
        let first = exprs.remove(0);
        exprs
            .into_iter()
            .fold(first, |acc, e| CExpr::bin(CBinOp::BitOr, acc, e))
    }
}

// ── Statements ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CondBranch {
    pub cond: CExpr,
    pub body: Vec<CStmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CStmt {
    Expr(CExpr),
    Assign { target: CExpr, value: CExpr },
    VarDecl {
        name: String,
        ty: CType,
        init: Option<CExpr>,
    },
    /// `if`/`else if` chain with an optional trailing `else`.
    If {
        branches: Vec<CondBranch>,
        else_body: Option<Vec<CStmt>>,
    },
    /// Unconditional loop; generated task bodies exit via `Break`.
    Loop(Vec<CStmt>),
    Break,
    Return(Option<CExpr>),
}

// ── Declarations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Storage {
    None,
    Static,
    Extern,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CTypeDef {
    Alias(CType),
    Record(Vec<CParam>),
    Array { element: CType, length: u32 },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum CDecl {
    /// Grouped comment banner.
    Comment(String),
    Include(String),
    Define { name: String, value: CExpr },
    /// Symbol-redirection table entry: `alias` resolves to `target`.
    SymbolAlias { alias: String, target: String },
    TypeDef { name: String, definition: CTypeDef },
    Var {
        name: String,
        ty: CType,
        storage: Storage,
        array_len: Option<u32>,
        init: Option<CExpr>,
    },
    FnProto(FnSignature),
    FnDef { sig: FnSignature, body: Vec<CStmt> },
}

/// One generated file: a stable relative name plus its ordered declarations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceUnit {
    pub file_name: String,
    pub decls: Vec<CDecl>,
}

// ── Tests ───────────────────────────────────────────────────────────────────
