use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use tokio::sync::RwLock;

use crate::err::Error;
use crate::models::{
    Address, NewAddress, NewStudent, Page, PageRequest, Role, Student, User,
};
use crate::service::{AddressService, StudentService, UserService};

/// In-process backend used when no database is configured. Enforces the same
/// student → address reference the schema does.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    students: BTreeMap<i64, StoredStudent>,
    addresses: BTreeMap<i64, Address>,
    users: BTreeMap<i64, User>,
    last_id: i64,
}

#[derive(Debug, Clone)]
struct StoredStudent {
    fields: NewStudent,
    created_at: Option<NaiveDateTime>,
    updated_at: Option<NaiveDateTime>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn student(&self, id: i64) -> Option<Student> {
        let stored = self.students.get(&id)?;
        let address = self.addresses.get(&stored.fields.address_id)?.clone();
        let fields = stored.fields.clone();
        Some(Student {
            id,
            name: fields.name,
            active: fields.deactivated_at.is_none(),
            deactivated_at: fields.deactivated_at,
            birth_date: fields.birth_date,
            father_name: fields.father_name,
            mother_name: fields.mother_name,
            parents_occupation: fields.parents_occupation,
            photo: fields.photo,
            address,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }

    fn page_of<F>(&self, page: PageRequest, matches: F) -> Page<Student>
    where
        F: Fn(&NewStudent) -> bool,
    {
        let ids: Vec<i64> = self
            .students
            .iter()
            .filter(|(_, stored)| matches(&stored.fields))
            .map(|(id, _)| *id)
            .collect();
        let students = ids
            .iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.per_page as usize)
            .filter_map(|id| self.student(*id))
            .collect();
        Page::new(students, page, ids.len() as i64)
    }

    fn check_address(&self, address_id: i64) -> Result<(), Error> {
        if self.addresses.contains_key(&address_id) {
            Ok(())
        } else {
            Err(Error::SqlError {
                message: format!("address {} does not exist", address_id),
            })
        }
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn now() -> Option<NaiveDateTime> {
    Some(Local::now().naive_local())
}

#[async_trait]
impl StudentService for MemoryStore {
    async fn list(&self, page: PageRequest) -> Result<Page<Student>, Error> {
        Ok(self.tables.read().await.page_of(page, |_| true))
    }

    async fn search(&self, query: &str, page: PageRequest) -> Result<Page<Student>, Error> {
        let needle = query.to_lowercase();
        Ok(self.tables.read().await.page_of(page, |s| {
            [&s.name, &s.father_name, &s.mother_name, &s.parents_occupation]
                .iter()
                .any(|field| field.to_lowercase().contains(&needle))
        }))
    }

    async fn get(&self, id: i64) -> Result<Option<Student>, Error> {
        Ok(self.tables.read().await.student(id))
    }

    async fn exists(&self, id: i64) -> Result<bool, Error> {
        Ok(self.tables.read().await.students.contains_key(&id))
    }

    async fn create(&self, student: NewStudent) -> Result<i64, Error> {
        let mut tables = self.tables.write().await;
        tables.check_address(student.address_id)?;
        let id = tables.next_id();
        tables.students.insert(
            id,
            StoredStudent {
                fields: student,
                created_at: now(),
                updated_at: now(),
            },
        );
        Ok(id)
    }

    async fn update(&self, id: i64, student: NewStudent) -> Result<bool, Error> {
        let mut tables = self.tables.write().await;
        tables.check_address(student.address_id)?;
        Ok(match tables.students.get_mut(&id) {
            Some(stored) => {
                stored.fields = student;
                stored.updated_at = now();
                true
            }
            None => false,
        })
    }

    async fn delete(&self, id: i64) -> Result<bool, Error> {
        Ok(self.tables.write().await.students.remove(&id).is_some())
    }

    async fn update_photo(&self, id: i64, url: &str) -> Result<bool, Error> {
        let mut tables = self.tables.write().await;
        Ok(match tables.students.get_mut(&id) {
            Some(stored) => {
                stored.fields.photo = url.to_string();
                stored.updated_at = now();
                true
            }
            None => false,
        })
    }
}

#[async_trait]
impl AddressService for MemoryStore {
    async fn create(&self, address: NewAddress) -> Result<i64, Error> {
        let mut tables = self.tables.write().await;
        let id = tables.next_id();
        tables.addresses.insert(
            id,
            Address {
                id,
                division: address.division,
                district: address.district,
                township: address.township,
                street_address: address.street_address,
                kind: address.kind,
                created_at: now(),
                updated_at: now(),
            },
        );
        Ok(id)
    }

    async fn update(&self, id: i64, address: NewAddress) -> Result<bool, Error> {
        let mut tables = self.tables.write().await;
        Ok(match tables.addresses.get_mut(&id) {
            Some(stored) => {
                stored.division = address.division;
                stored.district = address.district;
                stored.township = address.township;
                stored.street_address = address.street_address;
                stored.kind = address.kind;
                stored.updated_at = now();
                true
            }
            None => false,
        })
    }

    async fn delete(&self, id: i64) -> Result<bool, Error> {
        let mut tables = self.tables.write().await;
        if tables.students.values().any(|s| s.fields.address_id == id) {
            return Err(Error::SqlError {
                message: format!("address {} is still referenced by a student", id),
            });
        }
        Ok(tables.addresses.remove(&id).is_some())
    }
}

#[async_trait]
impl UserService for MemoryStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, Error> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn create(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<i64, Error> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == email) {
            return Err(Error::SqlError {
                message: format!("user with email `{}` already exists", email),
            });
        }
        let id = tables.next_id();
        tables.users.insert(
            id,
            User {
                id,
                username: username.to_string(),
                email: email.to_string(),
                password: password_hash.to_string(),
                role,
                created_at: now(),
                updated_at: now(),
            },
        );
        Ok(id)
    }
}
