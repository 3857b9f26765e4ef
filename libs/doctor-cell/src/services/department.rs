use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info};
use uuid::Uuid;

use shared_database::{timestamp_column, timestamp_param, uuid_column};

use crate::models::{
    CreateDepartmentRequest, Department, DepartmentOverview, DoctorError, UpdateDepartmentRequest,
};

fn map_department(row: &Row<'_>) -> rusqlite::Result<Department> {
    Ok(Department {
        id: uuid_column(row, 0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: timestamp_column(row, 3)?,
    })
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

pub struct DepartmentService<'a> {
    conn: &'a Connection,
}

impl<'a> DepartmentService<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    pub fn list_departments(&self) -> Result<Vec<DepartmentOverview>, DoctorError> {
        let mut stmt = self.conn.prepare(
            "SELECT d.id, d.name, d.description, d.created_at,
                    (SELECT COUNT(*) FROM doctor_profiles p WHERE p.department_id = d.id)
             FROM departments d
             ORDER BY d.name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(DepartmentOverview {
                department: map_department(row)?,
                doctor_count: row.get(4)?,
            })
        })?;
        let departments = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        debug!("Listed {} departments", departments.len());
        Ok(departments)
    }

    pub fn get_department(&self, id: Uuid) -> Result<Department, DoctorError> {
        self.conn
            .query_row(
                "SELECT id, name, description, created_at FROM departments WHERE id = ?1",
                params![id.to_string()],
                map_department,
            )
            .optional()?
            .ok_or(DoctorError::DepartmentNotFound)
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<Department>, DoctorError> {
        let department = self
            .conn
            .query_row(
                "SELECT id, name, description, created_at FROM departments WHERE name = ?1 COLLATE NOCASE",
                params![name.trim()],
                map_department,
            )
            .optional()?;
        Ok(department)
    }

    pub fn create_department(&self, request: CreateDepartmentRequest) -> Result<Department, DoctorError> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(DoctorError::Validation("Department name is required".to_string()));
        }
        if self.find_by_name(&name)?.is_some() {
            return Err(DoctorError::DuplicateDepartment(name));
        }

        let department = Department {
            id: Uuid::new_v4(),
            name,
            description: clean(request.description),
            created_at: Utc::now(),
        };
        self.conn.execute(
            "INSERT INTO departments (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                department.id.to_string(),
                department.name,
                department.description,
                timestamp_param(department.created_at),
            ],
        )?;

        info!("Created department {} ({})", department.name, department.id);
        Ok(department)
    }

    pub fn update_department(&self, id: Uuid, request: UpdateDepartmentRequest) -> Result<Department, DoctorError> {
        let mut department = self.get_department(id)?;

        if let Some(name) = clean(request.name) {
            if let Some(existing) = self.find_by_name(&name)? {
                if existing.id != id {
                    return Err(DoctorError::DuplicateDepartment(name));
                }
            }
            department.name = name;
        }
        if request.description.is_some() {
            department.description = clean(request.description);
        }

        self.conn.execute(
            "UPDATE departments SET name = ?2, description = ?3 WHERE id = ?1",
            params![id.to_string(), department.name, department.description],
        )?;

        info!("Updated department {}", id);
        Ok(department)
    }

    /// Refused while any doctor still belongs to the department.
    pub fn delete_department(&self, id: Uuid) -> Result<(), DoctorError> {
        self.get_department(id)?;

        let doctors: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM doctor_profiles WHERE department_id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        if doctors > 0 {
            return Err(DoctorError::DepartmentInUse(doctors));
        }

        self.conn
            .execute("DELETE FROM departments WHERE id = ?1", params![id.to_string()])?;
        info!("Deleted department {}", id);
        Ok(())
    }
}
