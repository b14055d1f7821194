//! Entity queries carried inside subscription commands.
//!
//! These mirror the platform's JSON query model: an entity filter selects the
//! entities, key filters narrow them by attribute or telemetry values, and an
//! entity-data page link pages the matching set.

use crate::page::SortDirection;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of platform entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    Tenant,
    Customer,
    User,
    Device,
    Asset,
    EntityView,
    Dashboard,
    Alarm,
    RuleChain,
    Edge,
    Notification,
}

/// Typed entity reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityId {
    pub entity_type: EntityType,
    pub id: Uuid,
}

impl EntityId {
    pub fn new(entity_type: EntityType, id: Uuid) -> Self {
        Self { entity_type, id }
    }

    /// A fresh random id, for fixtures.
    pub fn random(entity_type: EntityType) -> Self {
        Self::new(entity_type, Uuid::new_v4())
    }
}

/// Selects the entities a query runs over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EntityFilter {
    SingleEntity {
        single_entity: EntityId,
    },
    EntityType {
        entity_type: EntityType,
    },
    EntityList {
        entity_type: EntityType,
        entity_list: Vec<Uuid>,
    },
    DeviceType {
        device_types: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        device_name_filter: Option<String>,
    },
}

impl EntityFilter {
    pub fn single(entity_id: EntityId) -> Self {
        Self::SingleEntity {
            single_entity: entity_id,
        }
    }

    pub fn of_type(entity_type: EntityType) -> Self {
        Self::EntityType { entity_type }
    }

    pub fn device_type(device_type: impl Into<String>, name_filter: Option<&str>) -> Self {
        Self::DeviceType {
            device_types: vec![device_type.into()],
            device_name_filter: name_filter.map(str::to_string),
        }
    }
}

/// Where a key lives on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKeyType {
    Attribute,
    ClientAttribute,
    SharedAttribute,
    ServerAttribute,
    TimeSeries,
    EntityField,
    AlarmField,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityKey {
    #[serde(rename = "type")]
    pub key_type: EntityKeyType,
    pub key: String,
}

impl EntityKey {
    pub fn new(key_type: EntityKeyType, key: impl Into<String>) -> Self {
        Self {
            key_type,
            key: key.into(),
        }
    }

    pub fn time_series(key: impl Into<String>) -> Self {
        Self::new(EntityKeyType::TimeSeries, key)
    }

    pub fn attribute(key: impl Into<String>) -> Self {
        Self::new(EntityKeyType::Attribute, key)
    }

    pub fn entity_field(key: impl Into<String>) -> Self {
        Self::new(EntityKeyType::EntityField, key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKeyValueType {
    String,
    Numeric,
    Boolean,
    DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NumericOperation {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StringOperation {
    Equal,
    NotEqual,
    StartsWith,
    EndsWith,
    Contains,
    NotContains,
    In,
    NotIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BooleanOperation {
    Equal,
    NotEqual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPredicateValue<T> {
    pub default_value: T,
}

impl<T> FilterPredicateValue<T> {
    pub fn new(default_value: T) -> Self {
        Self { default_value }
    }
}

/// Predicate applied to a key's value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum KeyFilterPredicate {
    Numeric {
        operation: NumericOperation,
        value: FilterPredicateValue<f64>,
    },
    String {
        operation: StringOperation,
        value: FilterPredicateValue<String>,
        #[serde(default)]
        ignore_case: bool,
    },
    Boolean {
        operation: BooleanOperation,
        value: FilterPredicateValue<bool>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFilter {
    pub key: EntityKey,
    pub value_type: EntityKeyValueType,
    pub predicate: KeyFilterPredicate,
}

impl KeyFilter {
    /// Numeric comparison against a constant.
    pub fn numeric(key: EntityKey, operation: NumericOperation, value: f64) -> Self {
        Self {
            key,
            value_type: EntityKeyValueType::Numeric,
            predicate: KeyFilterPredicate::Numeric {
                operation,
                value: FilterPredicateValue::new(value),
            },
        }
    }

    pub fn string(key: EntityKey, operation: StringOperation, value: impl Into<String>) -> Self {
        Self {
            key,
            value_type: EntityKeyValueType::String,
            predicate: KeyFilterPredicate::String {
                operation,
                value: FilterPredicateValue::new(value.into()),
                ignore_case: false,
            },
        }
    }

    pub fn boolean(key: EntityKey, operation: BooleanOperation, value: bool) -> Self {
        Self {
            key,
            value_type: EntityKeyValueType::Boolean,
            predicate: KeyFilterPredicate::Boolean {
                operation,
                value: FilterPredicateValue::new(value),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDataSortOrder {
    pub key: EntityKey,
    pub direction: SortDirection,
}

/// Page link embedded in entity-data queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDataPageLink {
    pub page_size: usize,
    pub page: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<EntityDataSortOrder>,
    #[serde(default)]
    pub dynamic: bool,
}

impl EntityDataPageLink {
    pub fn new(page_size: usize, page: usize) -> Self {
        Self {
            page_size,
            page,
            text_search: None,
            sort_order: None,
            dynamic: false,
        }
    }

    pub fn with_sort_order(mut self, key: EntityKey, direction: SortDirection) -> Self {
        self.sort_order = Some(EntityDataSortOrder { key, direction });
        self
    }

    pub fn with_dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDataQuery {
    pub entity_filter: EntityFilter,
    pub page_link: EntityDataPageLink,
    #[serde(default)]
    pub entity_fields: Vec<EntityKey>,
    #[serde(default)]
    pub latest_values: Vec<EntityKey>,
    #[serde(default)]
    pub key_filters: Vec<KeyFilter>,
}

impl EntityDataQuery {
    pub fn new(entity_filter: EntityFilter, page_link: EntityDataPageLink) -> Self {
        Self {
            entity_filter,
            page_link,
            entity_fields: Vec::new(),
            latest_values: Vec::new(),
            key_filters: Vec::new(),
        }
    }

    pub fn with_entity_fields(mut self, fields: Vec<EntityKey>) -> Self {
        self.entity_fields = fields;
        self
    }

    pub fn with_latest_values(mut self, keys: Vec<EntityKey>) -> Self {
        self.latest_values = keys;
        self
    }

    pub fn with_key_filters(mut self, filters: Vec<KeyFilter>) -> Self {
        self.key_filters = filters;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityCountQuery {
    pub entity_filter: EntityFilter,
    #[serde(default)]
    pub key_filters: Vec<KeyFilter>,
}

impl EntityCountQuery {
    pub fn new(entity_filter: EntityFilter) -> Self {
        Self {
            entity_filter,
            key_filters: Vec::new(),
        }
    }

    pub fn with_key_filters(mut self, filters: Vec<KeyFilter>) -> Self {
        self.key_filters = filters;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmSeverity {
    Critical,
    Major,
    Minor,
    Warning,
    Indeterminate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmSearchStatus {
    Any,
    Active,
    Cleared,
    Ack,
    Unack,
}

/// Alarm count query; every criterion is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmCountQuery {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub type_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status_list: Vec<AlarmSearchStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub severity_list: Vec<AlarmSeverity>,
    #[serde(default)]
    pub search_propagated_alarms: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_filter: Option<EntityFilter>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_filters: Vec<KeyFilter>,
}

impl AlarmCountQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entity_filter(mut self, filter: EntityFilter) -> Self {
        self.entity_filter = Some(filter);
        self
    }

    pub fn with_severities(mut self, severities: Vec<AlarmSeverity>) -> Self {
        self.severity_list = severities;
        self
    }

    pub fn with_statuses(mut self, statuses: Vec<AlarmSearchStatus>) -> Self {
        self.status_list = statuses;
        self
    }

    pub fn with_assignee(mut self, assignee_id: Uuid) -> Self {
        self.assignee_id = Some(assignee_id);
        self
    }
}

/// Aggregation applied to time-series intervals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aggregation {
    Min,
    Max,
    Avg,
    Sum,
    Count,
    #[default]
    None,
}

/// Attribute scope for attribute subscriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttributeScope {
    ClientScope,
    ServerScope,
    SharedScope,
}
