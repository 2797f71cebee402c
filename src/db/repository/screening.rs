use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::{HealthScreening, NewHealthScreening};

pub fn insert_screening(
    conn: &Connection,
    screening: &NewHealthScreening,
    now: DateTime<Utc>,
) -> Result<HealthScreening, DatabaseError> {
    conn.execute(
        "INSERT INTO health_screenings (donor_id, bank_id, staff_id, screening_date, weight,
         blood_pressure, hemoglobin_level, temperature, deferral_reason, is_eligible_on_day)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            screening.donor_id,
            screening.bank_id,
            screening.staff_id,
            now,
            screening.weight,
            screening.blood_pressure,
            screening.hemoglobin_level,
            screening.temperature,
            screening.deferral_reason,
            screening.is_eligible_on_day as i32,
        ],
    )?;

    Ok(HealthScreening {
        id: conn.last_insert_rowid(),
        donor_id: screening.donor_id.clone(),
        bank_id: screening.bank_id,
        staff_id: screening.staff_id.clone(),
        screening_date: now,
        weight: screening.weight,
        blood_pressure: screening.blood_pressure.clone(),
        hemoglobin_level: screening.hemoglobin_level,
        temperature: screening.temperature,
        deferral_reason: screening.deferral_reason.clone(),
        is_eligible_on_day: screening.is_eligible_on_day,
    })
}

/// Screening history, most recent first, optionally for one donor.
pub fn list_screenings(
    conn: &Connection,
    donor_id: Option<&str>,
) -> Result<Vec<HealthScreening>, DatabaseError> {
    let sql_all =
        "SELECT id, donor_id, bank_id, staff_id, screening_date, weight, blood_pressure,
         hemoglobin_level, temperature, deferral_reason, is_eligible_on_day
         FROM health_screenings ORDER BY screening_date DESC";
    let sql_donor =
        "SELECT id, donor_id, bank_id, staff_id, screening_date, weight, blood_pressure,
         hemoglobin_level, temperature, deferral_reason, is_eligible_on_day
         FROM health_screenings WHERE donor_id = ?1 ORDER BY screening_date DESC";

    let mut screenings = Vec::new();
    match donor_id {
        Some(donor) => {
            let mut stmt = conn.prepare(sql_donor)?;
            let rows = stmt.query_map(params![donor], screening_row)?;
            for row in rows {
                screenings.push(row?);
            }
        }
        None => {
            let mut stmt = conn.prepare(sql_all)?;
            let rows = stmt.query_map([], screening_row)?;
            for row in rows {
                screenings.push(row?);
            }
        }
    }
    Ok(screenings)
}

fn screening_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<HealthScreening> {
    let eligible: i32 = row.get(10)?;
    Ok(HealthScreening {
        id: row.get(0)?,
        donor_id: row.get(1)?,
        bank_id: row.get(2)?,
        staff_id: row.get(3)?,
        screening_date: row.get(4)?,
        weight: row.get(5)?,
        blood_pressure: row.get(6)?,
        hemoglobin_level: row.get(7)?,
        temperature: row.get(8)?,
        deferral_reason: row.get(9)?,
        is_eligible_on_day: eligible != 0,
    })
}
