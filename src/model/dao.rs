// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! DAO models and operation descriptors.
//!
//! # Operation Kinds
//!
//! | Declaration | Kind |
//! |-------------|------|
//! | `#[query("...")]` (plus optional `#[postgres_query("...")]`) | [`OperationKind::Query`] |
//! | `#[insert]`, `#[insert(replace)]`, `#[update]`, `#[delete]` | [`OperationKind::Write`] |
//! | no annotation, default body | [`OperationKind::Custom`] |
//! | no annotation, no body | `MalformedDeclaration` |
//!
//! Write operations take exactly one parameter: an entity, a reference to
//! one, a `Vec` of them or a slice of them.

use crate::{
    declaration::{
        AnnotationTag, Declaration, DeclarationSource, Member, MemberKind, MethodSignature,
        QualifiedName, SourceLocation, TypeRef
    },
    error::{ModelError, UnresolvedReference},
    model::{
        Lookup, Resolved, predicates,
        returns::{self, is_integer, normalize}
    },
    target::Dialect
};

/// One data-access-object trait.
#[derive(Debug, Clone, PartialEq)]
pub struct DaoModel {
    /// Crate-relative path of the trait.
    pub name:       QualifiedName,
    /// Operations in declaration order.
    pub operations: Vec<OperationDescriptor>,
    /// Where the trait is declared.
    pub location:   Option<SourceLocation>
}

/// One DAO method.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationDescriptor {
    /// Method name.
    pub name:            String,
    /// Logical parameters, continuation excluded.
    pub params:          Vec<ParamModel>,
    /// Suspend style and abstractness.
    pub modifiers:       Modifiers,
    /// Return type as declared, kept to reproduce the trait signature.
    pub declared_return: Option<TypeRef>,
    /// Canonical logical return type.
    pub return_type:     TypeRef,
    /// What the operation does.
    pub kind:            OperationKind,
    /// Method annotations as declared.
    pub annotations:     Vec<AnnotationTag>,
    /// Where the method is declared.
    pub location:        Option<SourceLocation>
}

/// One logical parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamModel {
    /// Binding name.
    pub name:    String,
    /// Declared type.
    pub ty:      TypeRef,
    /// Receives the database-type discriminator.
    pub db_type: bool
}

/// Declared modifiers of an operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Modifiers {
    /// How the operation delivers its result.
    pub suspend:     SuspendStyle,
    /// No default body in the trait.
    pub is_abstract: bool
}

/// How an operation delivers its result.
#[derive(Debug, Clone, PartialEq)]
pub enum SuspendStyle {
    /// Plain `fn` returning the value.
    Blocking,
    /// `async fn` returning the value.
    Async,
    /// Plain `fn` handing the value to a trailing continuation parameter.
    Continuation {
        /// Parameter name.
        param: String,
        /// Declared parameter type (`Continuation<T>`).
        ty:    TypeRef
    }
}

impl SuspendStyle {
    /// Type carried by the continuation, as declared.
    #[must_use]
    pub fn carried(&self) -> Option<&TypeRef> {
        match self {
            Self::Continuation {
                ty, ..
            } => ty.first_arg(),
            Self::Blocking | Self::Async => None
        }
    }
}

/// What an operation does.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationKind {
    /// Runs a declared SQL statement.
    Query(QuerySpec),
    /// Writes entity rows.
    Write(WriteSpec),
    /// Inherits its default body.
    Custom
}

/// Declared SQL of a query operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// Dialect-neutral SQL.
    pub sql:       String,
    /// Per-dialect replacements.
    pub overrides: Vec<(Dialect, String)>
}

impl QuerySpec {
    /// SQL to run on a dialect.
    #[must_use]
    pub fn sql_for(&self, dialect: Dialect) -> &str {
        self.overrides
            .iter()
            .find(|(d, _)| *d == dialect)
            .map_or(self.sql.as_str(), |(_, sql)| sql.as_str())
    }
}

/// Entity write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSpec {
    /// Insert, update or delete.
    pub op:     WriteOp,
    /// Entity written.
    pub entity: QualifiedName,
    /// Parameter holding the entity (or entities).
    pub param:  String,
    /// The parameter is a `Vec` or slice.
    pub batch:  bool
}

/// Entity write flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOp {
    /// `INSERT`, or upsert when `replace` is set.
    Insert {
        /// Replace rows with the same primary key.
        replace: bool
    },
    /// `UPDATE` by primary key.
    Update,
    /// `DELETE` by primary key.
    Delete
}

impl WriteOp {
    /// Annotation name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Insert {
                ..
            } => "insert",
            Self::Update => "update",
            Self::Delete => "delete"
        }
    }
}

impl DaoModel {
    /// Operation by name.
    #[must_use]
    pub fn operation(&self, name: &str) -> Option<&OperationDescriptor> {
        self.operations.iter().find(|op| op.name == name)
    }
}

/// Build the model of a DAO declaration.
///
/// # Errors
///
/// - [`ModelError::Unresolved`] when a member type is not resolvable yet or
///   a write operation touches a deferred entity
/// - [`ModelError::MalformedDeclaration`] when an operation breaks one of
///   the rules in the module documentation
pub fn extract_dao(
    source: &dyn DeclarationSource,
    declaration: &Declaration,
    lookup: &Lookup<'_>
) -> Result<DaoModel, ModelError> {
    let name = &declaration.name;

    if let Some((attribute, reason)) = predicates::first_invalid(&declaration.annotations) {
        return Err(ModelError::malformed(
            name,
            declaration.location.as_ref(),
            format!("invalid `{attribute}` attribute: {reason}")
        ));
    }

    let members = source.members(declaration)?;
    let operations = members
        .iter()
        .map(|member| extract_operation(source, declaration, member, lookup))
        .collect::<Result<Vec<_>, _>>()?;

    tracing::trace!(dao = %name, operations = operations.len(), "dao modeled");

    Ok(DaoModel {
        name: name.clone(),
        operations,
        location: declaration.location.clone()
    })
}

fn extract_operation(
    source: &dyn DeclarationSource,
    declaration: &Declaration,
    member: &Member,
    lookup: &Lookup<'_>
) -> Result<OperationDescriptor, ModelError> {
    let location = member.location.as_ref().or(declaration.location.as_ref());
    let op = &member.name;
    let malformed = |reason: String| {
        ModelError::malformed(&declaration.name, location, format!("`{op}`: {reason}"))
    };

    let MemberKind::Method(signature) = &member.kind else {
        return Err(malformed("DAO members must be methods".to_string()));
    };
    if !signature.receiver {
        return Err(malformed("operations must take `&self`".to_string()));
    }

    let annotations = source.annotations_of(member);
    if let Some((attribute, reason)) = predicates::first_invalid(&annotations) {
        return Err(malformed(format!("invalid `{attribute}` attribute: {reason}")));
    }

    let suspend = suspend_style(signature).map_err(&malformed)?;
    let params = returns::logical_params(signature)
        .iter()
        .map(|param| ParamModel {
            name:    param.name.clone(),
            ty:      param.ty.clone(),
            db_type: predicates::has_db_type(&param.annotations)
        })
        .collect::<Vec<_>>();

    for param in params.iter().filter(|p| p.db_type) {
        if !is_integer(&normalize(&param.ty)) {
            return Err(malformed(format!(
                "`db_type` parameter `{}` must be an integer",
                param.name
            )));
        }
    }

    let return_type = returns::canonical_return_type(signature);
    let kind = operation_kind(&annotations, signature, &params, &return_type, lookup)
        .map_err(|err| match err {
            KindError::Malformed(reason) => malformed(reason),
            KindError::Deferred(reference) => UnresolvedReference {
                declaration: declaration.name.clone(),
                reference
            }
            .into()
        })?;

    Ok(OperationDescriptor {
        name: op.clone(),
        params,
        modifiers: Modifiers {
            suspend,
            is_abstract: !signature.has_body
        },
        declared_return: signature.returns.clone(),
        return_type,
        kind,
        annotations,
        location: member.location.clone()
    })
}

fn suspend_style(signature: &MethodSignature) -> Result<SuspendStyle, String> {
    match returns::continuation_param(signature) {
        Some(_) if signature.is_async => {
            Err("cannot be both `async` and continuation-style".to_string())
        }
        Some(_) if signature.returns.as_ref().is_some_and(|r| !r.is_unit()) => {
            Err("continuation-style operations must not declare a return type".to_string())
        }
        Some(param) => Ok(SuspendStyle::Continuation {
            param: param.name.clone(),
            ty:    param.ty.clone()
        }),
        None if signature.is_async => Ok(SuspendStyle::Async),
        None => Ok(SuspendStyle::Blocking)
    }
}

enum KindError {
    Malformed(String),
    Deferred(String)
}

fn operation_kind(
    annotations: &[AnnotationTag],
    signature: &MethodSignature,
    params: &[ParamModel],
    return_type: &TypeRef,
    lookup: &Lookup<'_>
) -> Result<OperationKind, KindError> {
    let mut query: Option<&str> = None;
    let mut overrides: Vec<(Dialect, String)> = Vec::new();
    let mut write: Option<WriteOp> = None;
    let mut markers = 0;

    for tag in annotations {
        match tag {
            AnnotationTag::Query(sql) => {
                query = Some(sql.as_str());
                markers += 1;
            }
            AnnotationTag::Insert {
                replace
            } => {
                write = Some(WriteOp::Insert {
                    replace: *replace
                });
                markers += 1;
            }
            AnnotationTag::Update => {
                write = Some(WriteOp::Update);
                markers += 1;
            }
            AnnotationTag::Delete => {
                write = Some(WriteOp::Delete);
                markers += 1;
            }
            AnnotationTag::DialectQuery {
                dialect,
                sql
            } => {
                if overrides.iter().any(|(d, _)| d == dialect) {
                    return Err(KindError::Malformed(format!(
                        "more than one {dialect} query override"
                    )));
                }
                overrides.push((*dialect, sql.clone()));
            }
            _ => {}
        }
    }

    if markers > 1 {
        return Err(KindError::Malformed(
            "declares more than one persistence annotation".to_string()
        ));
    }
    if markers == 1 && signature.has_body {
        return Err(KindError::Malformed(
            "persistence annotations require an operation without a default body".to_string()
        ));
    }
    if !overrides.is_empty() && query.is_none() {
        return Err(KindError::Malformed(
            "dialect query overrides need a dialect-neutral `#[query]`".to_string()
        ));
    }

    if let Some(sql) = query {
        if sql.trim().is_empty() {
            return Err(KindError::Malformed("query is empty".to_string()));
        }
        return Ok(OperationKind::Query(QuerySpec {
            sql: sql.to_string(),
            overrides
        }));
    }

    if let Some(op) = write {
        return write_spec(op, params, return_type, lookup).map(OperationKind::Write);
    }

    if signature.has_body {
        Ok(OperationKind::Custom)
    } else {
        Err(KindError::Malformed(
            "abstract operation has no persistence annotation".to_string()
        ))
    }
}

fn write_spec(
    op: WriteOp,
    params: &[ParamModel],
    return_type: &TypeRef,
    lookup: &Lookup<'_>
) -> Result<WriteSpec, KindError> {
    let label = op.label();
    let [param] = params else {
        return Err(KindError::Malformed(format!(
            "`{label}` operations take exactly one entity parameter"
        )));
    };

    let ty = normalize(&predicates::owned(&param.ty));
    let (element, batch) = match ty.element() {
        Some(element) => (predicates::owned(element), true),
        None => (ty.clone(), false)
    };
    if element.nullable {
        return Err(KindError::Malformed(format!(
            "`{label}` parameter `{}` cannot be optional",
            param.name
        )));
    }

    let entity = match lookup.entity(&element.name) {
        Resolved::Found(entity) => entity.clone(),
        Resolved::Deferred => return Err(KindError::Deferred(element.name.clone())),
        Resolved::Unknown => {
            return Err(KindError::Malformed(format!(
                "`{label}` parameter type `{}` is not an entity",
                element.render()
            )));
        }
        Resolved::Ambiguous => {
            return Err(KindError::Malformed(format!(
                "entity name `{}` is ambiguous; use its full path",
                element.name
            )));
        }
    };

    let returns_ok = return_type.is_unit()
        || (!batch && is_integer(return_type))
        || (batch && matches!(op, WriteOp::Update | WriteOp::Delete) && is_integer(return_type))
        || (batch
            && matches!(op, WriteOp::Insert { .. })
            && return_type.element().is_some_and(is_integer)
            && return_type.simple_name() == "Vec");
    if !returns_ok {
        let expected = match (op, batch) {
            (WriteOp::Insert { .. }, true) => "`()` or `Vec` of an integer type",
            _ => "`()` or an integer type"
        };
        return Err(KindError::Malformed(format!(
            "`{label}` operations return {expected}, not `{return_type}`"
        )));
    }

    Ok(WriteSpec {
        op,
        entity,
        param: param.name.clone(),
        batch
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        declaration::DeclarationKind,
        diagnostics::CollectingSink,
        model::{Model, entity::extract_entity},
        source::SynSource
    };

    const ENTITY: &str = r#"
        #[entity]
        pub struct Person {
            #[primary_key(auto_generate)]
            pub id: i64,
            pub name: String,
        }
    "#;

    fn extract(dao: &str) -> Result<DaoModel, ModelError> {
        let code = format!("{ENTITY}\n{dao}");
        let source = SynSource::parse("db.rs", "db", &code).unwrap();
        let sink = CollectingSink::new();
        let declarations = source.declarations();

        let mut model = Model::default();
        for declaration in declarations.iter().filter(|d| d.kind == DeclarationKind::Entity) {
            model.entities.push(extract_entity(&source, declaration, &sink).unwrap());
        }
        let lookup = Lookup::new(&model, &[]);
        let dao = declarations
            .iter()
            .find(|d| d.kind == DeclarationKind::Dao)
            .unwrap();
        extract_dao(&source, dao, &lookup)
    }

    #[test]
    fn query_and_write_operations() {
        let dao = extract(
            r#"
            #[dao]
            pub trait PersonDao {
                #[query("SELECT * FROM Person WHERE name = :name")]
                #[postgres_query("SELECT * FROM Person WHERE name ILIKE :name")]
                async fn by_name(&self, name: &str) -> Vec<Person>;

                #[insert]
                fn add(&self, person: &Person) -> i64;

                #[insert(replace)]
                fn add_all(&self, people: &[Person]);

                fn count_twice(&self) -> usize {
                    2
                }
            }
            "#
        )
        .unwrap();

        assert_eq!(dao.name.as_str(), "db::PersonDao");
        assert_eq!(dao.operations.len(), 4);

        let by_name = dao.operation("by_name").unwrap();
        assert_eq!(by_name.modifiers.suspend, SuspendStyle::Async);
        assert!(by_name.modifiers.is_abstract);
        let OperationKind::Query(query) = &by_name.kind else {
            panic!("expected a query");
        };
        assert!(query.sql_for(Dialect::Postgres).contains("ILIKE"));
        assert!(query.sql_for(Dialect::Sqlite).contains("name = :name"));

        let add = dao.operation("add").unwrap();
        let OperationKind::Write(write) = &add.kind else {
            panic!("expected a write");
        };
        assert_eq!(write.entity.as_str(), "db::Person");
        assert!(!write.batch);
        assert_eq!(add.return_type, TypeRef::named("i64"));

        let add_all = dao.operation("add_all").unwrap();
        let OperationKind::Write(write) = &add_all.kind else {
            panic!("expected a write");
        };
        assert!(write.batch);
        assert_eq!(write.op, WriteOp::Insert {
            replace: true
        });

        let custom = dao.operation("count_twice").unwrap();
        assert_eq!(custom.kind, OperationKind::Custom);
        assert!(!custom.modifiers.is_abstract);
    }

    #[test]
    fn continuation_operation() {
        let dao = extract(
            r#"
            #[dao]
            pub trait PersonDao {
                #[query("SELECT * FROM Person")]
                fn all(&self, cont: replikit::Continuation<Box<Vec<Person>>>);
            }
            "#
        )
        .unwrap();
        let all = &dao.operations[0];
        assert!(all.params.is_empty());
        assert!(matches!(&all.modifiers.suspend, SuspendStyle::Continuation { param, .. } if param == "cont"));
        assert_eq!(all.return_type, TypeRef::generic("Vec", [TypeRef::named("Person")]));
        assert!(all.modifiers.suspend.carried().is_some());
    }

    #[test]
    fn abstract_without_marker_is_malformed() {
        let err = extract(
            r#"
            #[dao]
            pub trait PersonDao {
                fn mystery(&self) -> i64;
            }
            "#
        )
        .unwrap_err();
        assert!(err.to_string().contains("no persistence annotation"));
    }

    #[test]
    fn write_of_non_entity_is_malformed() {
        let err = extract(
            r#"
            #[dao]
            pub trait PersonDao {
                #[delete]
                fn remove(&self, id: i64);
            }
            "#
        )
        .unwrap_err();
        assert!(err.to_string().contains("is not an entity"));
    }

    #[test]
    fn write_return_types_are_checked() {
        let err = extract(
            r#"
            #[dao]
            pub trait PersonDao {
                #[update]
                fn save(&self, person: Person) -> String;
            }
            "#
        )
        .unwrap_err();
        assert!(err.to_string().contains("integer"));
    }

    #[test]
    fn missing_receiver_is_malformed() {
        let err = extract(
            r#"
            #[dao]
            pub trait PersonDao {
                #[query("SELECT 1")]
                fn one() -> i64;
            }
            "#
        )
        .unwrap_err();
        assert!(err.to_string().contains("&self"));
    }

    #[test]
    fn db_type_parameters() {
        let dao = extract(
            r#"
            #[dao]
            pub trait PersonDao {
                #[query("SELECT * FROM Person WHERE :db = :db")]
                fn by_db(&self, #[db_type] db: i32) -> Vec<Person>;
            }
            "#
        )
        .unwrap();
        assert!(dao.operations[0].params[0].db_type);
    }

    #[test]
    fn async_continuation_is_malformed() {
        let err = extract(
            r#"
            #[dao]
            pub trait PersonDao {
                #[query("SELECT * FROM Person")]
                async fn all(&self, cont: Continuation<Vec<Person>>);
            }
            "#
        )
        .unwrap_err();
        assert!(err.to_string().contains("both"));
    }
}
