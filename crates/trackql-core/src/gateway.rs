use crate::introspection;
use crate::projection::{project, ProjectedField, Projection, TYPENAME_FIELD};
use crate::query::{parse_document, Document, Field, OperationDefinition, OperationType, Value, VariableDefinition};
use crate::storage::RecordStore;
use futures::future::try_join_all;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use trackql_common::config::{GatewayConfig, DEFAULT_LIST_CAP, DEFAULT_STORE_TIMEOUT_MS};
use trackql_common::operation::find_operation;
use trackql_common::{ArgType, EntityKind, GatewayError, LookupKey, OperationKind, OperationSpec, Record};

pub type Data = serde_json::Map<String, JsonValue>;

#[derive(Debug, Clone)]
pub struct GatewayPolicy {
    /// Maximum `list_all` result size for kinds that are capped.
    pub list_cap: usize,
    /// Deadline for each backing-store call.
    pub store_timeout: Duration,
}

impl Default for GatewayPolicy {
    fn default() -> Self {
        Self {
            list_cap: DEFAULT_LIST_CAP,
            store_timeout: Duration::from_millis(DEFAULT_STORE_TIMEOUT_MS),
        }
    }
}

impl From<&GatewayConfig> for GatewayPolicy {
    fn from(config: &GatewayConfig) -> Self {
        Self {
            list_cap: config.list_cap,
            store_timeout: Duration::from_millis(config.store_timeout_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Introspection {
    Enabled,
    Disabled,
}

/// Request envelope accepted by both HTTP routes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphRequest {
    pub query: String,
    #[serde(default)]
    pub variables: Option<serde_json::Map<String, JsonValue>>,
    #[serde(default)]
    pub operation_name: Option<String>,
}

impl GraphRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_variables(mut self, variables: JsonValue) -> Self {
        if let JsonValue::Object(map) = variables {
            self.variables = Some(map);
        }
        self
    }
}

/// One validated root selection, ready to dispatch.
#[derive(Debug)]
enum Plan {
    List { kind: EntityKind, fields: Vec<ProjectedField> },
    Lookup { kind: EntityKind, key: LookupKey, fields: Vec<ProjectedField> },
    Static(JsonValue),
}

struct Variables<'a> {
    definitions: &'a [VariableDefinition],
    provided: Option<&'a serde_json::Map<String, JsonValue>>,
}

impl Variables<'_> {
    fn resolve(&self, value: &Value) -> Result<JsonValue, GatewayError> {
        match value {
            Value::Variable(name) => {
                let def = self
                    .definitions
                    .iter()
                    .find(|d| &d.name == name)
                    .ok_or_else(|| GatewayError::UnknownVariable(name.clone()))?;
                if let Some(v) = self.provided.and_then(|p| p.get(name)) {
                    return Ok(v.clone());
                }
                match &def.default {
                    Some(Value::Variable(inner)) => Err(GatewayError::UnknownVariable(inner.clone())),
                    Some(default) => self.resolve(default),
                    None => Ok(JsonValue::Null),
                }
            }
            Value::Null => Ok(JsonValue::Null),
            Value::Int(i) => Ok(json!(i)),
            Value::String(s) => Ok(json!(s)),
            Value::Boolean(b) => Ok(json!(b)),
        }
    }
}

/// Only active accounts are listed; every other kind lists unfiltered.
fn is_listed(record: &Record) -> bool {
    match record {
        Record::User(u) => u.is_active,
        _ => true,
    }
}

fn validate_fields(kind: EntityKind, fields: &[ProjectedField]) -> Result<(), GatewayError> {
    if let Some(f) = fields.iter().find(|f| f.name != TYPENAME_FIELD && !kind.permits(&f.name)) {
        return Err(GatewayError::FieldNotPermitted { kind, field: f.name.clone() });
    }
    for (i, f) in fields.iter().enumerate() {
        if let Some(earlier) = fields[..i].iter().find(|e| e.key == f.key && e.name != f.name) {
            return Err(GatewayError::FieldsConflict {
                key: f.key.clone(),
                first: earlier.name.clone(),
                second: f.name.clone(),
            });
        }
    }
    Ok(())
}

/// Folds root selections sharing a response key. Repeats must name the same
/// operation with the same arguments; their sub-selections are combined.
fn merge_root_fields(fields: &[Field]) -> Result<Vec<Field>, GatewayError> {
    let mut merged: Vec<Field> = Vec::with_capacity(fields.len());
    for field in fields {
        match merged.iter_mut().find(|m| m.response_key() == field.response_key()) {
            Some(existing) if existing.name == field.name && existing.arguments == field.arguments => {
                existing.selection_set.extend(field.selection_set.iter().cloned());
            }
            Some(existing) => {
                return Err(GatewayError::FieldsConflict {
                    key: field.response_key().to_string(),
                    first: existing.name.clone(),
                    second: field.name.clone(),
                })
            }
            None => merged.push(field.clone()),
        }
    }
    Ok(merged)
}

fn check_key(kind: EntityKind, key: &LookupKey) -> Result<(), GatewayError> {
    let (argument, expected) = match kind {
        EntityKind::User | EntityKind::Person => ("id", ArgType::Int),
        EntityKind::Document => ("name", ArgType::String),
        EntityKind::Group => ("acronym", ArgType::String),
    };
    let matches = matches!(
        (key, expected),
        (LookupKey::Id(_), ArgType::Int) | (LookupKey::Name(_), ArgType::String)
    );
    if matches {
        Ok(())
    } else {
        Err(GatewayError::InvalidArgument {
            operation: kind.as_str().to_string(),
            argument: argument.to_string(),
            expected: expected.as_str(),
        })
    }
}

fn select_operation<'d>(
    document: &'d Document,
    operation_name: Option<&str>,
) -> Result<&'d OperationDefinition, GatewayError> {
    match operation_name {
        Some(name) => document
            .operations
            .iter()
            .find(|op| op.name.as_deref() == Some(name))
            .ok_or_else(|| GatewayError::UnknownOperationName(name.to_string())),
        None => match document.operations.as_slice() {
            [single] => Ok(single),
            _ => Err(GatewayError::AmbiguousOperation),
        },
    }
}

/// Sub-selection of an entity operation, checked against the allow-list.
fn projected_fields(spec: &OperationSpec, field: &Field) -> Result<Vec<ProjectedField>, GatewayError> {
    if field.selection_set.is_empty() {
        return Err(GatewayError::SelectionRequired(field.name.clone()));
    }
    let mut fields: Vec<ProjectedField> = Vec::with_capacity(field.selection_set.len());
    for sub in &field.selection_set {
        if sub.name != TYPENAME_FIELD && !spec.kind.permits(&sub.name) {
            return Err(GatewayError::FieldNotPermitted { kind: spec.kind, field: sub.name.clone() });
        }
        if !sub.selection_set.is_empty() {
            return Err(GatewayError::SubselectionNotAllowed { kind: spec.kind, field: sub.name.clone() });
        }
        if let Some((arg, _)) = sub.arguments.first() {
            return Err(GatewayError::UnknownArgument { operation: sub.name.clone(), argument: arg.clone() });
        }
        match fields.iter().find(|f| f.key == sub.response_key()) {
            // identical repeat
            Some(f) if f.name == sub.name => {}
            Some(f) => {
                return Err(GatewayError::FieldsConflict {
                    key: f.key.clone(),
                    first: f.name.clone(),
                    second: sub.name.clone(),
                })
            }
            None => fields.push(ProjectedField::aliased(sub.response_key(), sub.name.clone())),
        }
    }
    Ok(fields)
}

fn coerce_key(spec: &OperationSpec, arg: &str, arg_type: ArgType, value: JsonValue) -> Result<LookupKey, GatewayError> {
    let key = match (&value, arg_type) {
        (JsonValue::Null, _) => {
            return Err(GatewayError::MissingArgument {
                operation: spec.name.to_string(),
                argument: arg.to_string(),
            })
        }
        (JsonValue::Number(n), ArgType::Int) => n.as_i64().map(LookupKey::Id),
        (JsonValue::String(s), ArgType::String) => Some(LookupKey::Name(s.clone())),
        _ => None,
    };
    key.ok_or_else(|| GatewayError::InvalidArgument {
        operation: spec.name.to_string(),
        argument: arg.to_string(),
        expected: arg_type.as_str(),
    })
}

/// Read-only query gateway over a record store.
///
/// Holds no mutable state; clones share the store and policy.
#[derive(Clone)]
pub struct QueryGateway {
    store: Arc<dyn RecordStore>,
    policy: GatewayPolicy,
}

impl QueryGateway {
    pub fn new(store: Arc<dyn RecordStore>, policy: GatewayPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &GatewayPolicy {
        &self.policy
    }

    async fn call_store<T, F>(&self, kind: EntityKind, call: &'static str, fut: F) -> Result<T, GatewayError>
    where
        F: Future<Output = anyhow::Result<T>>,
    {
        match tokio::time::timeout(self.policy.store_timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                tracing::error!("{} for {} failed: {:#}", call, kind.as_str(), e);
                Err(GatewayError::BackingStoreFailure(format!("{} for {} failed: {}", call, kind.as_str(), e)))
            }
            Err(_) => {
                tracing::error!("{} for {} timed out after {:?}", call, kind.as_str(), self.policy.store_timeout);
                Err(GatewayError::BackingStoreFailure(format!(
                    "{} for {} timed out after {}ms",
                    call,
                    kind.as_str(),
                    self.policy.store_timeout.as_millis()
                )))
            }
        }
    }

    /// Lists `kind`, truncated to the policy cap unless the kind is uncapped.
    pub async fn list_all(&self, kind: EntityKind, fields: &[ProjectedField]) -> Result<Vec<Projection>, GatewayError> {
        validate_fields(kind, fields)?;
        let records = self.call_store(kind, "list_all", self.store.list_all(kind)).await?;
        let cap = if kind.is_list_capped() { self.policy.list_cap } else { usize::MAX };
        Ok(records
            .iter()
            .filter(|r| is_listed(r))
            .take(cap)
            .map(|r| project(r, fields))
            .collect())
    }

    /// Exact-match lookup. `Ok(None)` means no such record.
    pub async fn get_by_key(
        &self,
        kind: EntityKind,
        key: &LookupKey,
        fields: &[ProjectedField],
    ) -> Result<Option<Projection>, GatewayError> {
        validate_fields(kind, fields)?;
        check_key(kind, key)?;
        let record = self.call_store(kind, "get_by_key", self.store.get_by_key(kind, key)).await?;
        Ok(record.map(|r| project(&r, fields)))
    }

    fn plan(&self, field: &Field, vars: &Variables<'_>, introspection: Introspection) -> Result<Plan, GatewayError> {
        match field.name.as_str() {
            TYPENAME_FIELD => Ok(Plan::Static(json!(introspection::QUERY_TYPE))),
            "__schema" | "__type" if introspection == Introspection::Disabled => {
                Err(GatewayError::IntrospectionDisabled)
            }
            "__schema" => Ok(Plan::Static(introspection::select(&introspection::schema(), &field.selection_set))),
            "__type" => {
                let name = field
                    .argument("name")
                    .map(|v| vars.resolve(v))
                    .transpose()?
                    .and_then(|v| v.as_str().map(str::to_string))
                    .ok_or_else(|| GatewayError::MissingArgument {
                        operation: field.name.clone(),
                        argument: "name".into(),
                    })?;
                let ty = introspection::named_type(&name)
                    .map(|t| introspection::select(&t, &field.selection_set))
                    .unwrap_or(JsonValue::Null);
                Ok(Plan::Static(ty))
            }
            name => {
                let spec = find_operation(name).ok_or_else(|| GatewayError::UnknownOperation(name.to_string()))?;
                let fields = projected_fields(spec, field)?;
                match spec.op {
                    OperationKind::List => {
                        if let Some((arg, _)) = field.arguments.first() {
                            return Err(GatewayError::UnknownArgument {
                                operation: spec.name.to_string(),
                                argument: arg.clone(),
                            });
                        }
                        Ok(Plan::List { kind: spec.kind, fields })
                    }
                    OperationKind::Lookup { arg, arg_type } => {
                        if let Some((other, _)) = field.arguments.iter().find(|(n, _)| n != arg) {
                            return Err(GatewayError::UnknownArgument {
                                operation: spec.name.to_string(),
                                argument: other.clone(),
                            });
                        }
                        let value = match field.argument(arg) {
                            Some(v) => vars.resolve(v)?,
                            None => JsonValue::Null,
                        };
                        let key = coerce_key(spec, arg, arg_type, value)?;
                        Ok(Plan::Lookup { kind: spec.kind, key, fields })
                    }
                }
            }
        }
    }

    async fn resolve(&self, plan: Plan) -> Result<JsonValue, GatewayError> {
        match plan {
            Plan::List { kind, fields } => {
                let items = self.list_all(kind, &fields).await?;
                Ok(JsonValue::Array(items.into_iter().map(JsonValue::Object).collect()))
            }
            Plan::Lookup { kind, key, fields } => Ok(self
                .get_by_key(kind, &key, &fields)
                .await?
                .map(JsonValue::Object)
                .unwrap_or(JsonValue::Null)),
            Plan::Static(value) => Ok(value),
        }
    }

    /// Answers one query document.
    ///
    /// Every root selection is validated before any store call is made; a
    /// store failure in any selection fails the whole document with no
    /// partial data.
    pub async fn execute(&self, request: &GraphRequest, introspection: Introspection) -> Result<Data, GatewayError> {
        let document = parse_document(&request.query)?;
        let operation = select_operation(&document, request.operation_name.as_deref())?;
        if operation.operation_type != OperationType::Query {
            return Err(GatewayError::OperationNotSupported(operation.operation_type.as_str().to_string()));
        }

        let vars = Variables {
            definitions: &operation.variables,
            provided: request.variables.as_ref(),
        };
        let planned = merge_root_fields(&operation.selection_set)?
            .iter()
            .map(|f| Ok((f.response_key().to_string(), self.plan(f, &vars, introspection)?)))
            .collect::<Result<Vec<_>, GatewayError>>()?;

        tracing::debug!(
            "Executing {} root selection(s) of operation {:?}",
            planned.len(),
            operation.name
        );

        let resolved = try_join_all(planned.into_iter().map(|(key, plan)| async move {
            self.resolve(plan).await.map(|value| (key, value))
        }))
        .await?;

        Ok(resolved.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use anyhow::Result;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use trackql_common::{DocumentRecord, GroupRecord, PersonRecord, UserRecord};

    /// Counts calls before delegating to an in-memory store.
    struct CountingStore {
        inner: MemoryStore,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RecordStore for CountingStore {
        async fn list_all(&self, kind: EntityKind) -> Result<Vec<Record>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.list_all(kind).await
        }

        async fn get_by_key(&self, kind: EntityKind, key: &LookupKey) -> Result<Option<Record>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_by_key(kind, key).await
        }
    }

    struct FailingStore;

    #[async_trait]
    impl RecordStore for FailingStore {
        async fn list_all(&self, _kind: EntityKind) -> Result<Vec<Record>> {
            anyhow::bail!("connection refused")
        }

        async fn get_by_key(&self, _kind: EntityKind, _key: &LookupKey) -> Result<Option<Record>> {
            anyhow::bail!("connection refused")
        }
    }

    struct SlowStore;

    #[async_trait]
    impl RecordStore for SlowStore {
        async fn list_all(&self, _kind: EntityKind) -> Result<Vec<Record>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![])
        }

        async fn get_by_key(&self, _kind: EntityKind, _key: &LookupKey) -> Result<Option<Record>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }
    }

    fn user(id: i64, username: &str, is_active: bool) -> Record {
        Record::User(UserRecord {
            id,
            username: username.into(),
            password: "secret-hash".into(),
            email: format!("{}@example.org", username),
            first_name: "First".into(),
            last_name: "Last".into(),
            is_active,
            is_staff: false,
            last_login: None,
            date_joined: None,
        })
    }

    fn document(name: &str) -> Record {
        Record::Document(DocumentRecord {
            name: name.into(),
            title: format!("Title of {}", name),
            abstract_text: "Abstract".into(),
            rev: "00".into(),
            doc_type: Some("draft".into()),
            stream: Some("ietf".into()),
            group: Some(1),
            states: vec!["active".into()],
            external_url: String::new(),
            time: None,
        })
    }

    fn person(id: i64) -> Record {
        Record::Person(PersonRecord {
            id,
            name: format!("Person {}", id),
            ascii: format!("Person {}", id),
            email: None,
            user: None,
            biography: String::new(),
        })
    }

    fn group(id: i64, acronym: &str) -> Record {
        Record::Group(GroupRecord {
            id,
            name: acronym.to_uppercase(),
            acronym: acronym.into(),
            group_type: Some("wg".into()),
            state: Some("active".into()),
            description: String::new(),
            parent: None,
            list_email: format!("{}@ietf.org", acronym),
        })
    }

    async fn seeded() -> Arc<CountingStore> {
        let inner = MemoryStore::new();
        inner.extend(vec![user(1, "alice", true), user(2, "bob", false), user(3, "carol", true)]).await;
        inner.extend(vec![document("draft-ietf-quic-transport"), document("rfc9000")]).await;
        inner.extend(vec![person(10), person(11)]).await;
        inner.extend(vec![group(1, "quic"), group(2, "tls")]).await;
        Arc::new(CountingStore { inner, calls: AtomicUsize::new(0) })
    }

    fn gateway(store: Arc<dyn RecordStore>) -> QueryGateway {
        QueryGateway::new(store, GatewayPolicy::default())
    }

    fn fields(names: &[&str]) -> Vec<ProjectedField> {
        names.iter().map(|n| ProjectedField::new(*n)).collect()
    }

    #[tokio::test]
    async fn test_get_by_key_projects_requested_subset() -> Result<()> {
        let gw = gateway(seeded().await);

        let found = gw
            .get_by_key(EntityKind::User, &LookupKey::Id(1), &fields(&["username", "email"]))
            .await?
            .expect("user 1 exists");
        assert_eq!(found.len(), 2);
        assert_eq!(found["username"], "alice");
        assert_eq!(found["email"], "alice@example.org");

        let grp = gw
            .get_by_key(EntityKind::Group, &LookupKey::Name("tls".into()), &fields(&["id", "type"]))
            .await?
            .expect("tls exists");
        assert_eq!(grp["id"], 2);
        assert_eq!(grp["type"], "wg");
        Ok(())
    }

    #[tokio::test]
    async fn test_absent_keys_are_not_found() -> Result<()> {
        let gw = gateway(seeded().await);
        assert!(gw.get_by_key(EntityKind::User, &LookupKey::Id(99), &fields(&["id"])).await?.is_none());
        assert!(gw.get_by_key(EntityKind::Person, &LookupKey::Id(1), &fields(&["id"])).await?.is_none());
        assert!(gw
            .get_by_key(EntityKind::Document, &LookupKey::Name("rfc1".into()), &fields(&["name"]))
            .await?
            .is_none());
        assert!(gw
            .get_by_key(EntityKind::Group, &LookupKey::Name("nope".into()), &fields(&["name"]))
            .await?
            .is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_key_type_must_match_kind() {
        let gw = gateway(seeded().await);
        let err = gw
            .get_by_key(EntityKind::Group, &LookupKey::Id(1), &fields(&["name"]))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::InvalidArgument { .. }));
    }

    #[tokio::test]
    async fn test_list_cap_applies_to_documents() -> Result<()> {
        let inner = MemoryStore::new();
        inner.extend((0..500).map(|i| document(&format!("draft-{:03}", i)))).await;
        let gw = gateway(Arc::new(inner));

        let docs = gw.list_all(EntityKind::Document, &fields(&["name"])).await?;
        assert_eq!(docs.len(), 100);
        // truncation keeps the store's order
        assert_eq!(docs[0]["name"], "draft-000");
        assert_eq!(docs[99]["name"], "draft-099");
        Ok(())
    }

    #[tokio::test]
    async fn test_list_cap_applies_to_users_and_persons() -> Result<()> {
        let inner = MemoryStore::new();
        inner.extend((0..150).map(|i| user(i, &format!("u{}", i), true))).await;
        inner.extend((0..150).map(person)).await;
        let gw = gateway(Arc::new(inner));

        assert_eq!(gw.list_all(EntityKind::User, &fields(&["id"])).await?.len(), 100);
        assert_eq!(gw.list_all(EntityKind::Person, &fields(&["id"])).await?.len(), 100);
        Ok(())
    }

    #[tokio::test]
    async fn test_groups_are_listed_in_full() -> Result<()> {
        // Groups are uncapped today; this pins the current behaviour.
        let inner = MemoryStore::new();
        inner.extend((0..250).map(|i| group(i, &format!("wg{}", i)))).await;
        let gw = gateway(Arc::new(inner));

        assert_eq!(gw.list_all(EntityKind::Group, &fields(&["acronym"])).await?.len(), 250);
        Ok(())
    }

    #[tokio::test]
    async fn test_all_users_skips_inactive() -> Result<()> {
        let inner = MemoryStore::new();
        inner.extend(vec![user(1, "active", true), user(2, "inactive", false)]).await;
        let gw = gateway(Arc::new(inner));

        let users = gw.list_all(EntityKind::User, &fields(&["username", "isActive"])).await?;
        assert_eq!(users.len(), 1);
        assert_eq!(users[0]["username"], "active");

        // a direct lookup still finds the inactive account
        let inactive = gw.get_by_key(EntityKind::User, &LookupKey::Id(2), &fields(&["isActive"])).await?;
        assert_eq!(inactive.expect("user 2 exists")["isActive"], false);
        Ok(())
    }

    #[tokio::test]
    async fn test_unlisted_field_rejected_before_store_call() {
        let store = seeded().await;
        let gw = gateway(store.clone());

        let err = gw
            .get_by_key(EntityKind::User, &LookupKey::Id(1), &fields(&["username", "password"]))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::FieldNotPermitted { kind: EntityKind::User, field: "password".into() });

        let err = gw
            .execute(&GraphRequest::new("{ allGroups { acronym } allUsers { id password } }"), Introspection::Enabled)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::FieldNotPermitted { .. }));
        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_failure_is_distinct_from_not_found() {
        let gw = gateway(Arc::new(FailingStore));
        let err = gw
            .get_by_key(EntityKind::User, &LookupKey::Id(1), &fields(&["id"]))
            .await
            .unwrap_err();
        match err {
            GatewayError::BackingStoreFailure(msg) => assert!(msg.contains("connection refused")),
            other => panic!("expected store failure, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_store_deadline() {
        let policy = GatewayPolicy { list_cap: 100, store_timeout: Duration::from_millis(50) };
        let gw = QueryGateway::new(Arc::new(SlowStore), policy);

        let err = gw.list_all(EntityKind::Group, &fields(&["id"])).await.unwrap_err();
        match err {
            GatewayError::BackingStoreFailure(msg) => assert!(msg.contains("timed out after 50ms")),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_execute_document() -> Result<()> {
        let gw = gateway(seeded().await);
        let request = GraphRequest::new(
            r#"query Q($acr: String!) {
                users: allUsers { username }
                doc: documentByName(name: "rfc9000") { name title }
                missing: personById(id: 404) { id }
                groupByAcronym(acronym: $acr) { name __typename }
            }"#,
        )
        .with_variables(json!({ "acr": "quic" }));

        let data = gw.execute(&request, Introspection::Disabled).await?;
        let keys: Vec<_> = data.keys().cloned().collect();
        assert_eq!(keys, vec!["users", "doc", "missing", "groupByAcronym"]);
        assert_eq!(data["users"], json!([{ "username": "alice" }, { "username": "carol" }]));
        assert_eq!(data["doc"], json!({ "name": "rfc9000", "title": "Title of rfc9000" }));
        assert!(data["missing"].is_null());
        assert_eq!(data["groupByAcronym"], json!({ "name": "QUIC", "__typename": "GroupType" }));
        Ok(())
    }

    #[tokio::test]
    async fn test_execute_validation_errors() {
        let gw = gateway(seeded().await);
        let run = |q: &str| {
            let gw = gw.clone();
            let request = GraphRequest::new(q);
            async move { gw.execute(&request, Introspection::Enabled).await.unwrap_err() }
        };

        assert!(matches!(run("{ allTickets { id } }").await, GatewayError::UnknownOperation(_)));
        assert!(matches!(run("{ userById { id } }").await, GatewayError::MissingArgument { .. }));
        assert!(matches!(run(r#"{ userById(id: "1") { id } }"#).await, GatewayError::InvalidArgument { .. }));
        assert!(matches!(run("{ userById(id: 1, name: 2) { id } }").await, GatewayError::UnknownArgument { .. }));
        assert!(matches!(run("{ allGroups(first: 2) { id } }").await, GatewayError::UnknownArgument { .. }));
        assert!(matches!(run("{ userById(id: $id) { id } }").await, GatewayError::UnknownVariable(_)));
        assert!(matches!(run("{ allUsers }").await, GatewayError::SelectionRequired(_)));
        assert!(matches!(run("{ allDocuments { group { acronym } } }").await, GatewayError::SubselectionNotAllowed { .. }));
        assert!(matches!(run("mutation { allUsers { id } }").await, GatewayError::OperationNotSupported(_)));
        assert!(matches!(run("query A { allUsers { id } } query B { allGroups { id } }").await, GatewayError::AmbiguousOperation));
    }

    #[tokio::test]
    async fn test_operation_name_selects_operation() -> Result<()> {
        let gw = gateway(seeded().await);
        let mut request = GraphRequest::new("query A { allUsers { id } } query B { allGroups { acronym } }");
        request.operation_name = Some("B".into());

        let data = gw.execute(&request, Introspection::Enabled).await?;
        assert_eq!(data["allGroups"], json!([{ "acronym": "quic" }, { "acronym": "tls" }]));

        request.operation_name = Some("C".into());
        assert!(matches!(
            gw.execute(&request, Introspection::Enabled).await.unwrap_err(),
            GatewayError::UnknownOperationName(_)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_variable_defaults() -> Result<()> {
        let gw = gateway(seeded().await);
        let request = GraphRequest::new(r#"query ($acr: String = "tls") { groupByAcronym(acronym: $acr) { id } }"#);
        let data = gw.execute(&request, Introspection::Enabled).await?;
        assert_eq!(data["groupByAcronym"], json!({ "id": 2 }));
        Ok(())
    }

    #[tokio::test]
    async fn test_introspection_toggle() -> Result<()> {
        let gw = gateway(seeded().await);
        let request = GraphRequest::new(r#"{ __typename __type(name: "PersonType") { name fields { name } } }"#);

        let data = gw.execute(&request, Introspection::Enabled).await?;
        assert_eq!(data["__typename"], "Query");
        assert_eq!(data["__type"]["name"], "PersonType");
        assert_eq!(data["__type"]["fields"].as_array().map(Vec::len), Some(5));

        let err = gw.execute(&request, Introspection::Disabled).await.unwrap_err();
        assert_eq!(err, GatewayError::IntrospectionDisabled);
        Ok(())
    }

    #[tokio::test]
    async fn test_failure_yields_no_partial_data() {
        let gw = gateway(Arc::new(FailingStore));
        let err = gw
            .execute(&GraphRequest::new("{ __typename allGroups { id } }"), Introspection::Enabled)
            .await
            .unwrap_err();
        assert!(!err.is_validation());
    }

    #[tokio::test]
    async fn test_concurrent_requests_do_not_mix() -> Result<()> {
        let gw = gateway(seeded().await);
        let users = GraphRequest::new("{ userById(id: 3) { id username } }");
        let docs = GraphRequest::new(r#"{ documentByName(name: "draft-ietf-quic-transport") { name rev } }"#);

        let mut handles = Vec::new();
        for i in 0..32 {
            let gw = gw.clone();
            let request = if i % 2 == 0 { users.clone() } else { docs.clone() };
            handles.push(tokio::spawn(async move {
                (i, gw.execute(&request, Introspection::Disabled).await)
            }));
        }

        for handle in handles {
            let (i, result) = handle.await?;
            let data = result?;
            if i % 2 == 0 {
                assert_eq!(data.len(), 1);
                assert_eq!(data["userById"], json!({ "id": 3, "username": "carol" }));
            } else {
                assert_eq!(data.len(), 1);
                assert_eq!(data["documentByName"], json!({ "name": "draft-ietf-quic-transport", "rev": "00" }));
            }
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_conflicting_response_keys_rejected() {
        let store = seeded().await;
        let gw = gateway(store.clone());

        let err = gw
            .execute(&GraphRequest::new("{ userById(id: 1) { id id: username } }"), Introspection::Enabled)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            GatewayError::FieldsConflict { key: "id".into(), first: "id".into(), second: "username".into() }
        );

        let err = gw
            .execute(&GraphRequest::new("{ a: allUsers { id } a: allGroups { id } }"), Introspection::Enabled)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::FieldsConflict { .. }));

        let err = gw
            .execute(&GraphRequest::new("{ userById(id: 1) { id } userById(id: 3) { id } }"), Introspection::Enabled)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::FieldsConflict { .. }));

        let conflicting = vec![ProjectedField::new("id"), ProjectedField::aliased("id", "username")];
        let err = gw.get_by_key(EntityKind::User, &LookupKey::Id(1), &conflicting).await.unwrap_err();
        assert!(matches!(err, GatewayError::FieldsConflict { .. }));

        assert_eq!(store.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_repeated_selections_are_merged() -> Result<()> {
        let store = seeded().await;
        let gw = gateway(store.clone());

        let request = GraphRequest::new("{ userById(id: 1) { id } userById(id: 1) { username id } }");
        let data = gw.execute(&request, Introspection::Enabled).await?;
        assert_eq!(data.len(), 1);
        assert_eq!(data["userById"], json!({ "id": 1, "username": "alice" }));
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_multi_word_fields_use_camel_case() -> Result<()> {
        let gw = gateway(seeded().await);

        let request = GraphRequest::new("{ userById(id: 1) { firstName lastName isActive } }");
        let data = gw.execute(&request, Introspection::Disabled).await?;
        assert_eq!(data["userById"], json!({ "firstName": "First", "lastName": "Last", "isActive": true }));

        let err = gw
            .execute(&GraphRequest::new("{ allUsers { first_name } }"), Introspection::Disabled)
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::FieldNotPermitted { kind: EntityKind::User, field: "first_name".into() });
        Ok(())
    }
}
