//! Typed parse tree nodes (`Node` and friends from `pg_query.proto`, PG 17).
//!
//! The expression and DML messages that most tools inspect are modelled field
//! for field. Any other node kind decodes to [`NodeEnum::Other`], which keeps
//! the kind's field number and its encoded message, and sub-messages that are
//! not modelled (`WithClause`, `IntoClause`, ...) are kept as encoded bytes.
//! Both re-encode to exactly what the engine produced, so every decoded tree
//! can be handed back to the deparser.

use prost::bytes::{Buf, BufMut};
use prost::encoding::{self, DecodeContext, WireType};
use prost::{DecodeError, Message};

/// One parse tree node: a oneof over every node kind.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct Node {
    pub node: Option<NodeEnum>,
}

impl Node {
    pub fn new(node: NodeEnum) -> Self {
        Self { node: Some(node) }
    }

    /// Field number of the node kind, `None` for an empty node.
    pub fn tag(&self) -> Option<u32> {
        self.node.as_ref().map(NodeEnum::tag)
    }
}

impl Message for Node {
    fn encode_raw(&self, buf: &mut impl BufMut) {
        if let Some(node) = &self.node {
            node.encode(buf);
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        NodeEnum::merge(&mut self.node, tag, wire_type, buf, ctx)
    }

    fn encoded_len(&self) -> usize {
        self.node.as_ref().map_or(0, NodeEnum::encoded_len)
    }

    fn clear(&mut self) {
        self.node = None;
    }
}

/// A node kind without a typed message here.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct OpaqueNode {
    /// Field number in the `Node.node` oneof.
    pub tag: u32,
    /// The encoded message.
    pub payload: Vec<u8>,
}

macro_rules! node_enum {
    ($($tag:literal => $variant:ident($ty:ty) $name:literal,)*) => {
        #[derive(Clone, PartialEq, Debug)]
        pub enum NodeEnum {
            $($variant($ty),)*
            Other(OpaqueNode),
        }

        impl NodeEnum {
            pub fn tag(&self) -> u32 {
                match self {
                    $(NodeEnum::$variant(_) => $tag,)*
                    NodeEnum::Other(node) => node.tag,
                }
            }

            /// The message name in `pg_query.proto`, or `None` for a kind
            /// without a typed message.
            pub fn name(&self) -> Option<&'static str> {
                match self {
                    $(NodeEnum::$variant(_) => Some($name),)*
                    NodeEnum::Other(_) => None,
                }
            }

            fn encode(&self, buf: &mut impl BufMut) {
                match self {
                    $(NodeEnum::$variant(value) => encoding::message::encode($tag, value, buf),)*
                    NodeEnum::Other(node) => encoding::bytes::encode(node.tag, &node.payload, buf),
                }
            }

            fn encoded_len(&self) -> usize {
                match self {
                    $(NodeEnum::$variant(value) => encoding::message::encoded_len($tag, value),)*
                    NodeEnum::Other(node) => encoding::bytes::encoded_len(node.tag, &node.payload),
                }
            }

            fn merge(
                slot: &mut Option<NodeEnum>,
                tag: u32,
                wire_type: WireType,
                buf: &mut impl Buf,
                ctx: DecodeContext,
            ) -> Result<(), DecodeError> {
                match tag {
                    $($tag => {
                        if let Some(NodeEnum::$variant(value)) = slot {
                            return encoding::message::merge(wire_type, value, buf, ctx);
                        }
                        let mut value = <$ty>::default();
                        encoding::message::merge(wire_type, &mut value, buf, ctx)?;
                        *slot = Some(NodeEnum::$variant(value));
                        Ok(())
                    })*
                    _ => {
                        let mut payload = Vec::new();
                        encoding::bytes::merge(wire_type, &mut payload, buf, ctx)?;
                        *slot = Some(NodeEnum::Other(OpaqueNode { tag, payload }));
                        Ok(())
                    }
                }
            }
        }
    };
}

node_enum! {
    1 => Alias(Alias) "Alias",
    2 => RangeVar(Box<RangeVar>) "RangeVar",
    19 => BoolExpr(Box<BoolExpr>) "BoolExpr",
    50 => NullTest(Box<NullTest>) "NullTest",
    61 => JoinExpr(Box<JoinExpr>) "JoinExpr",
    65 => TypeName(Box<TypeName>) "TypeName",
    66 => ColumnRef(ColumnRef) "ColumnRef",
    67 => ParamRef(ParamRef) "ParamRef",
    68 => AExpr(Box<AExpr>) "A_Expr",
    69 => TypeCast(Box<TypeCast>) "TypeCast",
    72 => FuncCall(Box<FuncCall>) "FuncCall",
    73 => AStar(AStar) "A_Star",
    77 => ResTarget(Box<ResTarget>) "ResTarget",
    79 => SortBy(Box<SortBy>) "SortBy",
    132 => InsertStmt(Box<InsertStmt>) "InsertStmt",
    133 => DeleteStmt(Box<DeleteStmt>) "DeleteStmt",
    134 => UpdateStmt(Box<UpdateStmt>) "UpdateStmt",
    136 => SelectStmt(Box<SelectStmt>) "SelectStmt",
    260 => Integer(Integer) "Integer",
    261 => Float(Float) "Float",
    262 => Boolean(Boolean) "Boolean",
    263 => String(StringValue) "String",
    264 => BitString(BitString) "BitString",
    265 => List(List) "List",
    268 => AConst(Box<AConst>) "A_Const",
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Alias {
    #[prost(string, tag = "1")]
    pub aliasname: String,
    #[prost(message, repeated, tag = "2")]
    pub colnames: Vec<Node>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct RangeVar {
    #[prost(string, tag = "1")]
    pub catalogname: String,
    #[prost(string, tag = "2")]
    pub schemaname: String,
    #[prost(string, tag = "3")]
    pub relname: String,
    #[prost(bool, tag = "4")]
    pub inh: bool,
    #[prost(string, tag = "5")]
    pub relpersistence: String,
    #[prost(message, optional, tag = "6")]
    pub alias: Option<Alias>,
    #[prost(int32, tag = "7")]
    pub location: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BoolExpr {
    #[prost(message, optional, boxed, tag = "1")]
    pub xpr: Option<Box<Node>>,
    #[prost(enumeration = "BoolExprType", tag = "2")]
    pub boolop: i32,
    #[prost(message, repeated, tag = "3")]
    pub args: Vec<Node>,
    #[prost(int32, tag = "4")]
    pub location: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct NullTest {
    #[prost(message, optional, boxed, tag = "1")]
    pub xpr: Option<Box<Node>>,
    #[prost(message, optional, boxed, tag = "2")]
    pub arg: Option<Box<Node>>,
    /// `NullTestType`: 1 `IS NULL`, 2 `IS NOT NULL`.
    #[prost(int32, tag = "3")]
    pub nulltesttype: i32,
    #[prost(bool, tag = "4")]
    pub argisrow: bool,
    #[prost(int32, tag = "5")]
    pub location: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct JoinExpr {
    /// `JoinType`: 1 inner, 2 left, 3 full, 4 right, ...
    #[prost(int32, tag = "1")]
    pub jointype: i32,
    #[prost(bool, tag = "2")]
    pub is_natural: bool,
    #[prost(message, optional, boxed, tag = "3")]
    pub larg: Option<Box<Node>>,
    #[prost(message, optional, boxed, tag = "4")]
    pub rarg: Option<Box<Node>>,
    #[prost(message, repeated, tag = "5")]
    pub using_clause: Vec<Node>,
    #[prost(message, optional, tag = "6")]
    pub join_using_alias: Option<Alias>,
    #[prost(message, optional, boxed, tag = "7")]
    pub quals: Option<Box<Node>>,
    #[prost(message, optional, tag = "8")]
    pub alias: Option<Alias>,
    #[prost(int32, tag = "9")]
    pub rtindex: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TypeName {
    #[prost(message, repeated, tag = "1")]
    pub names: Vec<Node>,
    #[prost(uint32, tag = "2")]
    pub type_oid: u32,
    #[prost(bool, tag = "3")]
    pub setof: bool,
    #[prost(bool, tag = "4")]
    pub pct_type: bool,
    #[prost(message, repeated, tag = "5")]
    pub typmods: Vec<Node>,
    #[prost(int32, tag = "6")]
    pub typemod: i32,
    #[prost(message, repeated, tag = "7")]
    pub array_bounds: Vec<Node>,
    #[prost(int32, tag = "8")]
    pub location: i32,
}

/// A column reference; `fields` holds `String` and `A_Star` nodes.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ColumnRef {
    #[prost(message, repeated, tag = "1")]
    pub fields: Vec<Node>,
    #[prost(int32, tag = "2")]
    pub location: i32,
}

/// `$n`
#[derive(Clone, PartialEq, prost::Message)]
pub struct ParamRef {
    #[prost(int32, tag = "1")]
    pub number: i32,
    #[prost(int32, tag = "2")]
    pub location: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct AExpr {
    #[prost(enumeration = "AExprKind", tag = "1")]
    pub kind: i32,
    /// Operator name, as `String` nodes.
    #[prost(message, repeated, tag = "2")]
    pub name: Vec<Node>,
    #[prost(message, optional, boxed, tag = "3")]
    pub lexpr: Option<Box<Node>>,
    #[prost(message, optional, boxed, tag = "4")]
    pub rexpr: Option<Box<Node>>,
    #[prost(int32, tag = "5")]
    pub location: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TypeCast {
    #[prost(message, optional, boxed, tag = "1")]
    pub arg: Option<Box<Node>>,
    #[prost(message, optional, tag = "2")]
    pub type_name: Option<TypeName>,
    #[prost(int32, tag = "3")]
    pub location: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct FuncCall {
    #[prost(message, repeated, tag = "1")]
    pub funcname: Vec<Node>,
    #[prost(message, repeated, tag = "2")]
    pub args: Vec<Node>,
    #[prost(message, repeated, tag = "3")]
    pub agg_order: Vec<Node>,
    #[prost(message, optional, boxed, tag = "4")]
    pub agg_filter: Option<Box<Node>>,
    /// Encoded `WindowDef`.
    #[prost(bytes = "vec", optional, tag = "5")]
    pub over: Option<Vec<u8>>,
    #[prost(bool, tag = "6")]
    pub agg_within_group: bool,
    #[prost(bool, tag = "7")]
    pub agg_star: bool,
    #[prost(bool, tag = "8")]
    pub agg_distinct: bool,
    #[prost(bool, tag = "9")]
    pub func_variadic: bool,
    /// `CoercionForm`.
    #[prost(int32, tag = "10")]
    pub funcformat: i32,
    #[prost(int32, tag = "11")]
    pub location: i32,
}

/// `*` in a target list or column reference.
#[derive(Clone, PartialEq, prost::Message)]
pub struct AStar {}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ResTarget {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(message, repeated, tag = "2")]
    pub indirection: Vec<Node>,
    #[prost(message, optional, boxed, tag = "3")]
    pub val: Option<Box<Node>>,
    #[prost(int32, tag = "4")]
    pub location: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SortBy {
    #[prost(message, optional, boxed, tag = "1")]
    pub node: Option<Box<Node>>,
    /// `SortByDir`: 1 default, 2 asc, 3 desc, 4 using.
    #[prost(int32, tag = "2")]
    pub sortby_dir: i32,
    /// `SortByNulls`: 1 default, 2 first, 3 last.
    #[prost(int32, tag = "3")]
    pub sortby_nulls: i32,
    #[prost(message, repeated, tag = "4")]
    pub use_op: Vec<Node>,
    #[prost(int32, tag = "5")]
    pub location: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct InsertStmt {
    #[prost(message, optional, tag = "1")]
    pub relation: Option<RangeVar>,
    #[prost(message, repeated, tag = "2")]
    pub cols: Vec<Node>,
    #[prost(message, optional, boxed, tag = "3")]
    pub select_stmt: Option<Box<Node>>,
    /// Encoded `OnConflictClause`.
    #[prost(bytes = "vec", optional, tag = "4")]
    pub on_conflict_clause: Option<Vec<u8>>,
    #[prost(message, repeated, tag = "5")]
    pub returning_list: Vec<Node>,
    /// Encoded `WithClause`.
    #[prost(bytes = "vec", optional, tag = "6")]
    pub with_clause: Option<Vec<u8>>,
    /// `OverridingKind`.
    #[prost(int32, tag = "7")]
    pub r#override: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct DeleteStmt {
    #[prost(message, optional, tag = "1")]
    pub relation: Option<RangeVar>,
    #[prost(message, repeated, tag = "2")]
    pub using_clause: Vec<Node>,
    #[prost(message, optional, boxed, tag = "3")]
    pub where_clause: Option<Box<Node>>,
    #[prost(message, repeated, tag = "4")]
    pub returning_list: Vec<Node>,
    #[prost(bytes = "vec", optional, tag = "5")]
    pub with_clause: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct UpdateStmt {
    #[prost(message, optional, tag = "1")]
    pub relation: Option<RangeVar>,
    #[prost(message, repeated, tag = "2")]
    pub target_list: Vec<Node>,
    #[prost(message, optional, boxed, tag = "3")]
    pub where_clause: Option<Box<Node>>,
    #[prost(message, repeated, tag = "4")]
    pub from_clause: Vec<Node>,
    #[prost(message, repeated, tag = "5")]
    pub returning_list: Vec<Node>,
    #[prost(bytes = "vec", optional, tag = "6")]
    pub with_clause: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct SelectStmt {
    #[prost(message, repeated, tag = "1")]
    pub distinct_clause: Vec<Node>,
    /// Encoded `IntoClause`.
    #[prost(bytes = "vec", optional, tag = "2")]
    pub into_clause: Option<Vec<u8>>,
    #[prost(message, repeated, tag = "3")]
    pub target_list: Vec<Node>,
    #[prost(message, repeated, tag = "4")]
    pub from_clause: Vec<Node>,
    #[prost(message, optional, boxed, tag = "5")]
    pub where_clause: Option<Box<Node>>,
    #[prost(message, repeated, tag = "6")]
    pub group_clause: Vec<Node>,
    #[prost(bool, tag = "7")]
    pub group_distinct: bool,
    #[prost(message, optional, boxed, tag = "8")]
    pub having_clause: Option<Box<Node>>,
    #[prost(message, repeated, tag = "9")]
    pub window_clause: Vec<Node>,
    #[prost(message, repeated, tag = "10")]
    pub values_lists: Vec<Node>,
    #[prost(message, repeated, tag = "11")]
    pub sort_clause: Vec<Node>,
    #[prost(message, optional, boxed, tag = "12")]
    pub limit_offset: Option<Box<Node>>,
    #[prost(message, optional, boxed, tag = "13")]
    pub limit_count: Option<Box<Node>>,
    #[prost(enumeration = "LimitOption", tag = "14")]
    pub limit_option: i32,
    #[prost(message, repeated, tag = "15")]
    pub locking_clause: Vec<Node>,
    /// Encoded `WithClause`.
    #[prost(bytes = "vec", optional, tag = "16")]
    pub with_clause: Option<Vec<u8>>,
    #[prost(enumeration = "SetOperation", tag = "17")]
    pub op: i32,
    #[prost(bool, tag = "18")]
    pub all: bool,
    #[prost(message, optional, boxed, tag = "19")]
    pub larg: Option<Box<SelectStmt>>,
    #[prost(message, optional, boxed, tag = "20")]
    pub rarg: Option<Box<SelectStmt>>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Integer {
    #[prost(int32, tag = "1")]
    pub ival: i32,
}

/// Numeric literal too large for `Integer`, kept as text.
#[derive(Clone, PartialEq, prost::Message)]
pub struct Float {
    #[prost(string, tag = "1")]
    pub fval: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Boolean {
    #[prost(bool, tag = "1")]
    pub boolval: bool,
}

/// The `String` node: identifiers, operator names, string literals.
#[derive(Clone, PartialEq, prost::Message)]
pub struct StringValue {
    #[prost(string, tag = "1")]
    pub sval: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct BitString {
    #[prost(string, tag = "1")]
    pub bsval: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct List {
    #[prost(message, repeated, tag = "1")]
    pub items: Vec<Node>,
}

/// A literal constant; `val` is `None` for `NULL`.
#[derive(Clone, PartialEq, prost::Message)]
pub struct AConst {
    #[prost(oneof = "AConstValue", tags = "1, 2, 3, 4, 5")]
    pub val: Option<AConstValue>,
    #[prost(bool, tag = "10")]
    pub isnull: bool,
    #[prost(int32, tag = "11")]
    pub location: i32,
}

#[derive(Clone, PartialEq, prost::Oneof)]
pub enum AConstValue {
    #[prost(message, tag = "1")]
    Ival(Integer),
    #[prost(message, tag = "2")]
    Fval(Float),
    #[prost(message, tag = "3")]
    Boolval(Boolean),
    #[prost(message, tag = "4")]
    Sval(StringValue),
    #[prost(message, tag = "5")]
    Bsval(BitString),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum BoolExprType {
    Undefined = 0,
    AndExpr = 1,
    OrExpr = 2,
    NotExpr = 3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum AExprKind {
    Undefined = 0,
    AexprOp = 1,
    AexprOpAny = 2,
    AexprOpAll = 3,
    AexprDistinct = 4,
    AexprNotDistinct = 5,
    AexprNullif = 6,
    AexprIn = 7,
    AexprLike = 8,
    AexprIlike = 9,
    AexprSimilar = 10,
    AexprBetween = 11,
    AexprNotBetween = 12,
    AexprBetweenSym = 13,
    AexprNotBetweenSym = 14,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum SetOperation {
    Undefined = 0,
    SetopNone = 1,
    SetopUnion = 2,
    SetopIntersect = 3,
    SetopExcept = 4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum LimitOption {
    Undefined = 0,
    Default = 1,
    Count = 2,
    WithTies = 3,
}
