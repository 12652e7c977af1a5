use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::err::Error;

pub const STUDENT_ADDRESS_TYPE: &str = "student";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Address {
    pub id: i64,
    pub division: String,
    pub district: String,
    pub township: String,
    pub street_address: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Student {
    pub id: i64,
    pub name: String,
    pub active: bool,
    pub deactivated_at: Option<NaiveDateTime>,
    pub birth_date: NaiveDate,
    pub father_name: String,
    pub mother_name: String,
    pub parents_occupation: String,
    pub photo: String,
    pub address: Address,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// Flat row of a student joined with its address.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StudentRow {
    pub id: i64,
    pub name: String,
    pub deactivated_at: Option<NaiveDateTime>,
    pub birth_date: NaiveDate,
    pub father_name: String,
    pub mother_name: String,
    pub parents_occupation: String,
    pub photo: String,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub address_id: i64,
    pub division: String,
    pub district: String,
    pub township: String,
    pub street_address: String,
    pub address_type: String,
    pub address_created_at: Option<NaiveDateTime>,
    pub address_updated_at: Option<NaiveDateTime>,
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Student {
            id: row.id,
            name: row.name,
            active: row.deactivated_at.is_none(),
            deactivated_at: row.deactivated_at,
            birth_date: row.birth_date,
            father_name: row.father_name,
            mother_name: row.mother_name,
            parents_occupation: row.parents_occupation,
            photo: row.photo,
            address: Address {
                id: row.address_id,
                division: row.division,
                district: row.district,
                township: row.township,
                street_address: row.street_address,
                kind: row.address_type,
                created_at: row.address_created_at,
                updated_at: row.address_updated_at,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressPayload {
    pub division: String,
    pub district: String,
    pub township: String,
    pub street_address: String,
}

impl AddressPayload {
    pub fn validate(&self) -> Result<(), Error> {
        require("division", &self.division)?;
        require("district", &self.district)?;
        require("township", &self.township)?;
        require("street_address", &self.street_address)
    }

    pub fn for_student(self) -> NewAddress {
        NewAddress {
            division: self.division,
            district: self.district,
            township: self.township,
            street_address: self.street_address,
            kind: STUDENT_ADDRESS_TYPE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAddress {
    pub division: String,
    pub district: String,
    pub township: String,
    pub street_address: String,
    pub kind: String,
}

/// Body of `POST /students` and `PUT /students/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct StudentPayload {
    pub name: String,
    #[serde(default)]
    pub active: bool,
    pub birth_date: NaiveDate,
    pub father_name: String,
    pub mother_name: String,
    pub parents_occupation: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub address: Option<AddressPayload>,
}

impl StudentPayload {
    pub fn validate(&self) -> Result<(), Error> {
        require("name", &self.name)?;
        require("father_name", &self.father_name)?;
        require("mother_name", &self.mother_name)?;
        require("parents_occupation", &self.parents_occupation)?;
        if let Some(address) = &self.address {
            address.validate()?;
        }
        Ok(())
    }

    /// Core student fields, linked to `address_id`. `photo` falls back to
    /// `current_photo` when the payload omits it.
    pub fn into_new_student(self, address_id: i64, current_photo: &str) -> NewStudent {
        NewStudent {
            name: self.name,
            deactivated_at: if self.active {
                None
            } else {
                Some(Local::now().naive_local())
            },
            birth_date: self.birth_date,
            father_name: self.father_name,
            mother_name: self.mother_name,
            parents_occupation: self.parents_occupation,
            photo: self.photo.unwrap_or_else(|| current_photo.to_string()),
            address_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewStudent {
    pub name: String,
    pub deactivated_at: Option<NaiveDateTime>,
    pub birth_date: NaiveDate,
    pub father_name: String,
    pub mother_name: String,
    pub parents_occupation: String,
    pub photo: String,
    pub address_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    SubAdmin,
    Donator,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(String);

impl TryFrom<String> for Role {
    type Error = UnknownRole;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "admin" => Ok(Role::Admin),
            "sub_admin" => Ok(Role::SubAdmin),
            "donator" => Ok(Role::Donator),
            _ => Err(UnknownRole(value)),
        }
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::SubAdmin => "sub_admin",
            Role::Donator => "donator",
        }
    }

    pub fn is_sub_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SubAdmin)
    }

    pub fn is_full_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
}

/// One page of records plus the counters the frontend pages with.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub students: Vec<T>,
    pub total_count: i64,
    pub pages: i64,
    pub current_page: i64,
    pub next_page: Option<i64>,
    pub prev_page: Option<i64>,
}

impl<T> Page<T> {
    pub fn new(students: Vec<T>, page: PageRequest, total_count: i64) -> Self {
        let pages = (total_count + page.per_page - 1) / page.per_page;
        Page {
            students,
            total_count,
            pages,
            current_page: page.page,
            next_page: (page.page < pages).then(|| page.page + 1),
            prev_page: (page.page > 1).then(|| page.page - 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub const DEFAULT_PAGE: i64 = 1;
    pub const DEFAULT_PER_PAGE: i64 = 20;
    pub const MAX_PER_PAGE: i64 = 100;
    /// Highest page whose offset still fits in an `i64`.
    pub const MAX_PAGE: i64 = i64::MAX / Self::MAX_PER_PAGE;

    /// Lenient parse: unparsable values fall back to the defaults.
    pub fn parse(page: Option<&str>, per_page: Option<&str>) -> Self {
        let page = page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(Self::DEFAULT_PAGE)
            .clamp(1, Self::MAX_PAGE);
        let per_page = per_page
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(Self::DEFAULT_PER_PAGE)
            .clamp(1, Self::MAX_PER_PAGE);
        PageRequest { page, per_page }
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        PageRequest {
            page: Self::DEFAULT_PAGE,
            per_page: Self::DEFAULT_PER_PAGE,
        }
    }
}

fn require(field: &str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::invalid(format!("`{}` must not be empty", field)));
    }
    Ok(())
}
