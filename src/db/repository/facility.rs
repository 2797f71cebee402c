use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::enums::Role;
use crate::models::{BloodBank, Hospital, User};

pub fn insert_hospital(conn: &Connection, hospital: &Hospital) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO hospitals (id, name, address, city, contact_phone)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            hospital.id,
            hospital.name,
            hospital.address,
            hospital.city,
            hospital.contact_phone,
        ],
    )?;
    Ok(())
}

pub fn get_hospital(conn: &Connection, id: i64) -> Result<Option<Hospital>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, name, address, city, contact_phone FROM hospitals WHERE id = ?1",
        params![id],
        |row| {
            Ok(Hospital {
                id: row.get(0)?,
                name: row.get(1)?,
                address: row.get(2)?,
                city: row.get(3)?,
                contact_phone: row.get(4)?,
            })
        },
    );
    match result {
        Ok(h) => Ok(Some(h)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_hospitals(conn: &Connection) -> Result<Vec<Hospital>, DatabaseError> {
    let mut stmt =
        conn.prepare("SELECT id, name, address, city, contact_phone FROM hospitals ORDER BY id")?;
    let rows = stmt.query_map([], |row| {
        Ok(Hospital {
            id: row.get(0)?,
            name: row.get(1)?,
            address: row.get(2)?,
            city: row.get(3)?,
            contact_phone: row.get(4)?,
        })
    })?;

    let mut hospitals = Vec::new();
    for row in rows {
        hospitals.push(row?);
    }
    Ok(hospitals)
}

pub fn insert_blood_bank(conn: &Connection, bank: &BloodBank) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO blood_banks (id, name, address, city, contact_phone, operating_hours)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            bank.id,
            bank.name,
            bank.address,
            bank.city,
            bank.contact_phone,
            bank.operating_hours,
        ],
    )?;
    Ok(())
}

pub fn get_blood_bank(conn: &Connection, id: i64) -> Result<Option<BloodBank>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, name, address, city, contact_phone, operating_hours
         FROM blood_banks WHERE id = ?1",
        params![id],
        |row| {
            Ok(BloodBank {
                id: row.get(0)?,
                name: row.get(1)?,
                address: row.get(2)?,
                city: row.get(3)?,
                contact_phone: row.get(4)?,
                operating_hours: row.get(5)?,
            })
        },
    );
    match result {
        Ok(b) => Ok(Some(b)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub fn list_blood_banks(conn: &Connection) -> Result<Vec<BloodBank>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, address, city, contact_phone, operating_hours
         FROM blood_banks ORDER BY id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(BloodBank {
            id: row.get(0)?,
            name: row.get(1)?,
            address: row.get(2)?,
            city: row.get(3)?,
            contact_phone: row.get(4)?,
            operating_hours: row.get(5)?,
        })
    })?;

    let mut banks = Vec::new();
    for row in rows {
        banks.push(row?);
    }
    Ok(banks)
}

pub fn insert_user(conn: &Connection, user: &User) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO users (id, first_name, last_name, role, contact_phone, hospital_id,
         bank_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            user.id,
            user.first_name,
            user.last_name,
            user.role.as_str(),
            user.contact_phone,
            user.hospital_id,
            user.bank_id,
            user.created_at,
        ],
    )?;
    Ok(())
}

pub fn get_user(conn: &Connection, id: &str) -> Result<Option<User>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, first_name, last_name, role, contact_phone, hospital_id, bank_id, created_at
         FROM users WHERE id = ?1",
        params![id],
        |row| {
            Ok(UserRow {
                id: row.get(0)?,
                first_name: row.get(1)?,
                last_name: row.get(2)?,
                role: row.get(3)?,
                contact_phone: row.get(4)?,
                hospital_id: row.get(5)?,
                bank_id: row.get(6)?,
                created_at: row.get(7)?,
            })
        },
    );
    match result {
        Ok(row) => Ok(Some(User {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            role: Role::from_str(&row.role)?,
            contact_phone: row.contact_phone,
            hospital_id: row.hospital_id,
            bank_id: row.bank_id,
            created_at: row.created_at,
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

struct UserRow {
    id: String,
    first_name: String,
    last_name: String,
    role: String,
    contact_phone: Option<String>,
    hospital_id: Option<i64>,
    bank_id: Option<i64>,
    created_at: DateTime<Utc>,
}
