//! Bootstrap types every policy script relies on.

use crate::error::BindError;
use crate::globals::GlobalTable;
use crate::id::InitClass;
use indexmap::IndexMap;
use std::rc::Rc;
use tapscript_types::{
    Attr, AttrError, AttrKind, Attributes, AttributesRef, EnumVal, Expr, RecordField, TransportProto,
    Type, TypeKind, TypeRef, Value,
};

/// Type aliases installed by [`GlobalTable::init`].
#[derive(Debug, Clone)]
pub struct WellKnownTypes {
    pub conn_id: TypeRef,
    pub endpoint: TypeRef,
    pub connection: TypeRef,
    pub fa_file: TypeRef,
    pub fa_metadata: TypeRef,
    pub transport_proto: TypeRef,
    pub string_set: TypeRef,
    pub string_array: TypeRef,
    pub count_set: TypeRef,
    pub string_vec: TypeRef,
    pub index_vec: TypeRef,
}

impl WellKnownTypes {
    pub fn build() -> Result<Self, AttrError> {
        let field_attrs = |attrs: Vec<Attr>| -> AttributesRef {
            Rc::new(Attributes::from_attrs(attrs, None, true, false))
        };
        // Shared by every field declared with the same attribute list.
        let logged = field_attrs(vec![Attr::new(AttrKind::Logged)]);
        let optional = field_attrs(vec![Attr::new(AttrKind::Optional)]);
        let defaulted = |value: Value| -> Result<AttributesRef, AttrError> {
            let default = Attr::with_expr(AttrKind::HasDefault, Expr::constant(value))?;
            Ok(field_attrs(vec![default]))
        };

        let transport_proto = Type::named(
            "transport_proto",
            TypeKind::Enum {
                names: TransportProto::NAMES.iter().map(|n| n.to_string()).collect(),
            },
        );

        let string_set = Type::named("string_set", Type::set_of(vec![Type::string()]).kind.clone());
        let count_set = Type::named("count_set", Type::set_of(vec![Type::count()]).kind.clone());
        let string_array = Type::named(
            "string_array",
            Type::table_of(vec![Type::count()], Type::string()).kind.clone(),
        );
        let string_vec = Type::named("string_vec", Type::vector_of(Type::string()).kind.clone());
        let index_vec = Type::named("index_vec", Type::vector_of(Type::count()).kind.clone());

        let conn_id = record(
            "conn_id",
            [
                ("orig_h", RecordField::with_attrs(Type::addr(), logged.clone())),
                ("orig_p", RecordField::with_attrs(Type::port(), logged.clone())),
                ("resp_h", RecordField::with_attrs(Type::addr(), logged.clone())),
                ("resp_p", RecordField::with_attrs(Type::port(), logged.clone())),
            ],
        );

        let endpoint = record(
            "endpoint",
            [
                ("size", RecordField::new(Type::count())),
                ("state", RecordField::new(Type::count())),
                ("flow_label", RecordField::new(Type::count())),
                ("l2_addr", RecordField::with_attrs(Type::string(), optional.clone())),
            ],
        );

        let connection = record(
            "connection",
            [
                ("id", RecordField::new(conn_id.clone())),
                ("orig", RecordField::new(endpoint.clone())),
                ("resp", RecordField::new(endpoint.clone())),
                ("start_time", RecordField::new(Type::time())),
                ("duration", RecordField::new(Type::interval())),
                ("service", RecordField::new(string_set.clone())),
                ("history", RecordField::new(Type::string())),
                ("uid", RecordField::new(Type::string())),
            ],
        );

        let fa_file = record(
            "fa_file",
            [
                ("id", RecordField::with_attrs(Type::string(), logged.clone())),
                ("parent_id", RecordField::with_attrs(Type::string(), optional.clone())),
                ("source", RecordField::new(Type::string())),
                ("is_orig", RecordField::with_attrs(Type::bool(), optional.clone())),
                (
                    "conns",
                    RecordField::with_attrs(
                        Type::table_of(vec![conn_id.clone()], connection.clone()),
                        optional.clone(),
                    ),
                ),
                ("last_active", RecordField::new(Type::time())),
                ("seen_bytes", RecordField::with_attrs(Type::count(), defaulted(Value::Count(0))?)),
                ("total_bytes", RecordField::with_attrs(Type::count(), optional.clone())),
                ("missing_bytes", RecordField::with_attrs(Type::count(), defaulted(Value::Count(0))?)),
                ("overflow_bytes", RecordField::with_attrs(Type::count(), defaulted(Value::Count(0))?)),
            ],
        );

        let fa_metadata = record(
            "fa_metadata",
            [
                ("mime_type", RecordField::with_attrs(Type::string(), optional.clone())),
                ("mime_types", RecordField::with_attrs(string_vec.clone(), optional)),
                (
                    "inferred",
                    RecordField::with_attrs(Type::bool(), defaulted(Value::Bool(true))?),
                ),
            ],
        );

        Ok(Self {
            conn_id,
            endpoint,
            connection,
            fa_file,
            fa_metadata,
            transport_proto,
            string_set,
            string_array,
            count_set,
            string_vec,
            index_vec,
        })
    }

    /// Alias names paired with their types, in installation order.
    pub fn aliases(&self) -> [(&'static str, &TypeRef); 11] {
        [
            ("conn_id", &self.conn_id),
            ("endpoint", &self.endpoint),
            ("connection", &self.connection),
            ("fa_file", &self.fa_file),
            ("fa_metadata", &self.fa_metadata),
            ("transport_proto", &self.transport_proto),
            ("string_set", &self.string_set),
            ("string_array", &self.string_array),
            ("count_set", &self.count_set),
            ("string_vec", &self.string_vec),
            ("index_vec", &self.index_vec),
        ]
    }
}

fn record<const N: usize>(name: &str, fields: [(&str, RecordField); N]) -> TypeRef {
    let fields: IndexMap<String, RecordField> = fields
        .into_iter()
        .map(|(field, ty)| (field.to_string(), ty))
        .collect();
    Type::named(name, TypeKind::Record { fields })
}

/// Install the type aliases and the `transport_proto` constants.
pub(crate) fn install(table: &mut GlobalTable) -> Result<WellKnownTypes, BindError> {
    let types = WellKnownTypes::build()?;

    for (name, ty) in types.aliases() {
        let id = table.install(name, true);
        id.set_type(Rc::clone(ty))?;
        id.make_type();
    }

    for (ordinal, name) in TransportProto::NAMES.iter().enumerate() {
        let id = table.install(name, true);
        id.set_type(Rc::clone(&types.transport_proto))?;
        id.set_const();
        id.set_enum_const();
        let value = Value::Enum(EnumVal {
            name: name.to_string(),
            ordinal: ordinal as u64,
        });
        id.set_val(Rc::new(value), InitClass::Full)?;
    }

    Ok(types)
}
