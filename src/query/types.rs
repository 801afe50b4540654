use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema-qualified table or view name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub schema: Option<String>,
    pub table: String,
}

impl Relation {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: Some(schema.into()),
            table: table.into(),
        }
    }

    /// Relation without a schema qualifier (resolved through search_path)
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
        }
    }

    /// Parse "schema.table" or "table"
    pub fn parse(name: &str) -> Self {
        match name.split_once('.') {
            Some((schema, table)) => Self::new(schema, table),
            None => Self::table(name),
        }
    }
}

/// How a predicate attaches to the one before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Join {
    #[default]
    And,
    Or,
}

impl Join {
    pub fn to_sql(&self) -> &'static str {
        match self {
            Join::And => "AND",
            Join::Or => "OR",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// `key operator value`
    Compare {
        key: String,
        operator: String,
        value: Value,
        #[serde(default)]
        join: Join,
    },
    /// `key = ANY(ARRAY[...])`
    AnyOf {
        key: String,
        values: Vec<Value>,
        #[serde(default)]
        join: Join,
    },
}

impl Predicate {
    pub fn eq(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(key, "=", value)
    }

    pub fn compare(key: impl Into<String>, operator: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            key: key.into(),
            operator: operator.into(),
            value: value.into(),
            join: Join::And,
        }
    }

    pub fn any_of<V: Into<Value>>(key: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Predicate::AnyOf {
            key: key.into(),
            values: values.into_iter().map(Into::into).collect(),
            join: Join::And,
        }
    }

    /// Join this predicate to the previous one with OR
    pub fn or(self) -> Self {
        self.with_join(Join::Or)
    }

    pub fn with_join(mut self, new_join: Join) -> Self {
        match &mut self {
            Predicate::Compare { join, .. } | Predicate::AnyOf { join, .. } => *join = new_join,
        }
        self
    }

    pub fn join(&self) -> Join {
        match self {
            Predicate::Compare { join, .. } | Predicate::AnyOf { join, .. } => *join,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub column: String,
    #[serde(default)]
    pub direction: SortDirection,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self { column: column.into(), direction: SortDirection::Asc }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self { column: column.into(), direction: SortDirection::Desc }
    }
}

/// Whether the database should return one JSON object or a JSON array
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinality {
    #[default]
    Single,
    List,
}

/// Role and user the statement batch runs as. Empty strings mean "not set".
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SecurityContext {
    pub role: String,
    #[serde(rename = "userID")]
    pub user_id: String,
}

impl SecurityContext {
    pub fn new(role: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self { role: role.into(), user_id: user_id.into() }
    }
}

/// Compilation stage at which the SQL text is frozen into a cache key.
///
/// `PreRoleScoping` shares results across every role and user,
/// `PostRoleScoping` across users of one role, `PostUserScoping` only
/// across identical (role, user) pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheScope {
    #[default]
    None,
    PreRoleScoping,
    PostRoleScoping,
    PostUserScoping,
}

impl std::str::FromStr for CacheScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "" | "none" => Ok(CacheScope::None),
            "pre_role" | "pre_role_scoping" => Ok(CacheScope::PreRoleScoping),
            "post_role" | "post_role_scoping" => Ok(CacheScope::PostRoleScoping),
            "post_user" | "post_user_scoping" => Ok(CacheScope::PostUserScoping),
            other => Err(format!("unknown cache scope: {}", other)),
        }
    }
}

/// A logical read (or raw statement) against the database.
///
/// Plain data: build it with struct update syntax or the chaining helpers.
/// Nothing is validated until [`crate::query::compile`] runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub relation: Option<Relation>,
    #[serde(default)]
    pub projection: Vec<String>,
    #[serde(default)]
    pub predicates: Vec<Predicate>,
    #[serde(default)]
    pub order_by: Vec<OrderBy>,
    pub limit: Option<u64>,
    #[serde(default)]
    pub cardinality: Cardinality,
    #[serde(default)]
    pub security: SecurityContext,
    #[serde(default)]
    pub cache_scope: CacheScope,
    /// Complete SQL that replaces everything but role/user scoping
    pub raw_override: Option<String>,
}

impl Query {
    pub fn list(relation: Relation) -> Self {
        Self {
            relation: Some(relation),
            cardinality: Cardinality::List,
            ..Default::default()
        }
    }

    pub fn single(relation: Relation) -> Self {
        Self {
            relation: Some(relation),
            cardinality: Cardinality::Single,
            ..Default::default()
        }
    }

    pub fn raw(sql: impl Into<String>, cardinality: Cardinality) -> Self {
        Self {
            raw_override: Some(sql.into()),
            cardinality,
            ..Default::default()
        }
    }

    pub fn select<S: Into<String>>(mut self, columns: impl IntoIterator<Item = S>) -> Self {
        self.projection = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn order(mut self, order: OrderBy) -> Self {
        self.order_by.push(order);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn scoped(mut self, security: SecurityContext) -> Self {
        self.security = security;
        self
    }

    pub fn cached(mut self, scope: CacheScope) -> Self {
        self.cache_scope = scope;
        self
    }
}
