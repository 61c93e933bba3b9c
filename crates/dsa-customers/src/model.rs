//! Customer domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A customer as stored by either system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// System-local identifier
    pub id: Uuid,
    /// First name
    pub name: String,
    /// Last name
    pub surname: String,
    /// Age in years
    pub age: u32,
}

impl Customer {
    /// Same customer under another identifier
    #[inline]
    #[must_use]
    pub fn with_id(self, id: Uuid) -> Self {
        Self { id, ..self }
    }

    /// Compare everything except the identifier
    #[must_use]
    pub fn same_details(&self, other: &Self) -> bool {
        self.name == other.name && self.surname == other.surname && self.age == other.age
    }

    /// Describe the first field that differs from `other`
    #[must_use]
    pub fn first_difference(&self, other: &Self) -> Option<String> {
        if self.name != other.name {
            Some(format!("name: {:?} != {:?}", self.name, other.name))
        } else if self.surname != other.surname {
            Some(format!("surname: {:?} != {:?}", self.surname, other.surname))
        } else if self.age != other.age {
            Some(format!("age: {} != {}", self.age, other.age))
        } else {
            None
        }
    }
}

/// Create a customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCustomerRequest {
    /// First name
    pub name: String,
    /// Last name
    pub surname: String,
    /// Age in years
    pub age: u32,
}

impl CreateCustomerRequest {
    /// New create request
    pub fn new(name: impl Into<String>, surname: impl Into<String>, age: u32) -> Self {
        Self {
            name: name.into(),
            surname: surname.into(),
            age,
        }
    }
}

/// Look a customer up by identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetCustomerById {
    /// Identifier in the receiving system's space
    pub id: Uuid,
}

impl GetCustomerById {
    /// New lookup
    #[inline]
    #[must_use]
    pub fn new(id: Uuid) -> Self {
        Self { id }
    }
}

/// Rename a customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeCustomerName {
    /// Identifier in the receiving system's space
    pub id: Uuid,
    /// New first name
    pub name: String,
}

impl ChangeCustomerName {
    /// New rename request
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Requests addressed to one existing customer
pub trait Addressed {
    /// Identifier the request targets
    fn customer_id(&self) -> Uuid;

    /// Retarget the request
    fn set_customer_id(&mut self, id: Uuid);
}

impl Addressed for GetCustomerById {
    fn customer_id(&self) -> Uuid {
        self.id
    }

    fn set_customer_id(&mut self, id: Uuid) {
        self.id = id;
    }
}

impl Addressed for ChangeCustomerName {
    fn customer_id(&self) -> Uuid {
        self.id
    }

    fn set_customer_id(&mut self, id: Uuid) {
        self.id = id;
    }
}
