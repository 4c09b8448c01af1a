//! Field and operator catalogs: the static registry of segmentable customer
//! attributes and the comparison operators each attribute type accepts.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::predicates::{ConditionOperator, ConditionValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Number,
    Date,
    String,
    Array,
}

impl FieldType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "number" => Some(FieldType::Number),
            "date" => Some(FieldType::Date),
            "string" => Some(FieldType::String),
            "array" => Some(FieldType::Array),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldType::Number => "number",
            FieldType::Date => "date",
            FieldType::String => "string",
            FieldType::Array => "array",
        }
    }
}

/// A segmentable customer attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    TotalSpend,
    Visits,
    LastPurchaseDate,
    JoinDate,
    Tags,
    FirstName,
    LastName,
    Email,
    PhoneNumber,
}

impl Field {
    /// Catalog order, as presented to rule authors.
    pub const ALL: [Field; 9] = [
        Field::TotalSpend,
        Field::Visits,
        Field::LastPurchaseDate,
        Field::JoinDate,
        Field::Tags,
        Field::FirstName,
        Field::LastName,
        Field::Email,
        Field::PhoneNumber,
    ];

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.id() == id)
    }

    pub fn id(&self) -> &'static str {
        match self {
            Field::TotalSpend => "totalSpend",
            Field::Visits => "visits",
            Field::LastPurchaseDate => "lastPurchaseDate",
            Field::JoinDate => "joinDate",
            Field::Tags => "tags",
            Field::FirstName => "firstName",
            Field::LastName => "lastName",
            Field::Email => "email",
            Field::PhoneNumber => "phoneNumber",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::TotalSpend => "Total Spend",
            Field::Visits => "Number of Visits",
            Field::LastPurchaseDate => "Last Purchase Date",
            Field::JoinDate => "Join Date",
            Field::Tags => "Tags",
            Field::FirstName => "First Name",
            Field::LastName => "Last Name",
            Field::Email => "Email",
            Field::PhoneNumber => "Phone Number",
        }
    }

    pub fn field_type(&self) -> FieldType {
        match self {
            Field::TotalSpend | Field::Visits => FieldType::Number,
            Field::LastPurchaseDate | Field::JoinDate => FieldType::Date,
            Field::Tags => FieldType::Array,
            Field::FirstName | Field::LastName | Field::Email | Field::PhoneNumber => {
                FieldType::String
            }
        }
    }

    pub fn descriptor(&self) -> FieldDescriptor {
        FieldDescriptor {
            id: self.id(),
            label: self.label(),
            field_type: self.field_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    #[serde(rename = "type")]
    pub field_type: FieldType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperatorOption {
    pub id: ConditionOperator,
    pub label: &'static str,
}

static STRING_OPERATORS: [OperatorOption; 4] = [
    OperatorOption { id: ConditionOperator::Equals, label: "equals" },
    OperatorOption { id: ConditionOperator::NotEquals, label: "does not equal" },
    OperatorOption { id: ConditionOperator::Contains, label: "contains" },
    OperatorOption { id: ConditionOperator::NotContains, label: "does not contain" },
];

static NUMBER_OPERATORS: [OperatorOption; 4] = [
    OperatorOption { id: ConditionOperator::Equals, label: "equals" },
    OperatorOption { id: ConditionOperator::NotEquals, label: "does not equal" },
    OperatorOption { id: ConditionOperator::GreaterThan, label: "is greater than" },
    OperatorOption { id: ConditionOperator::LessThan, label: "is less than" },
];

static DATE_OPERATORS: [OperatorOption; 4] = [
    OperatorOption { id: ConditionOperator::Before, label: "is before" },
    OperatorOption { id: ConditionOperator::After, label: "is after" },
    OperatorOption { id: ConditionOperator::Between, label: "is between" },
    OperatorOption { id: ConditionOperator::Equals, label: "is exactly" },
];

static ARRAY_OPERATORS: [OperatorOption; 2] = [
    OperatorOption { id: ConditionOperator::Contains, label: "contains" },
    OperatorOption { id: ConditionOperator::NotContains, label: "does not contain" },
];

/// All segmentable fields in catalog order.
pub fn list_fields() -> Vec<FieldDescriptor> {
    Field::ALL.iter().map(Field::descriptor).collect()
}

/// Legal operators for a field type, in presentation order.
pub fn operators_for(field_type: FieldType) -> &'static [OperatorOption] {
    match field_type {
        FieldType::String => &STRING_OPERATORS,
        FieldType::Number => &NUMBER_OPERATORS,
        FieldType::Date => &DATE_OPERATORS,
        FieldType::Array => &ARRAY_OPERATORS,
    }
}

/// Like [`operators_for`], keyed by type name. Unknown names yield no operators.
pub fn operators_for_type(name: &str) -> &'static [OperatorOption] {
    match FieldType::parse(name) {
        Some(field_type) => operators_for(field_type),
        None => &[],
    }
}

pub fn is_legal(field_type: FieldType, operator: ConditionOperator) -> bool {
    operators_for(field_type).iter().any(|o| o.id == operator)
}

/// Label an operator the way the catalog presents it for this field type.
pub fn operator_label(field_type: FieldType, operator: ConditionOperator) -> &'static str {
    operators_for(field_type)
        .iter()
        .find(|o| o.id == operator)
        .map_or(operator.id(), |o| o.label)
}

/// The operator a condition switches to when its field changes.
pub fn default_operator(field: Field) -> ConditionOperator {
    operators_for(field.field_type())[0].id
}

/// Starting value for a condition after its field or operator changes.
pub fn default_value_for(field_id: &str, operator: ConditionOperator) -> ConditionValue {
    default_value_for_at(field_id, operator, Utc::now().date_naive())
}

pub fn default_value_for_at(
    field_id: &str,
    operator: ConditionOperator,
    today: NaiveDate,
) -> ConditionValue {
    let Some(field) = Field::from_id(field_id) else {
        return ConditionValue::Text(String::new());
    };

    match field.field_type() {
        FieldType::Number => ConditionValue::Number(1000.0),
        FieldType::Date => {
            let date = today.format("%Y-%m-%d").to_string();
            if operator == ConditionOperator::Between {
                ConditionValue::List(vec![date.clone(), date])
            } else {
                ConditionValue::Text(date)
            }
        }
        FieldType::String | FieldType::Array => ConditionValue::Text(String::new()),
    }
}
