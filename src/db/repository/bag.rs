use std::str::FromStr;

use chrono::NaiveDate;
use rusqlite::{params, Connection};

use crate::db::DatabaseError;
use crate::models::enums::{BagStatus, BloodType};
use crate::models::{BloodBag, NewBloodBag};

const BAG_COLUMNS: &str =
    "id, donor_id, health_screening_id, bank_id, blood_type, component_type,
     collection_date, expiry_date, status";

pub fn insert_bag(conn: &Connection, bag: &NewBloodBag) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO blood_bags (id, donor_id, health_screening_id, bank_id, blood_type,
         component_type, collection_date, expiry_date, status)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 'Pending Testing')",
        params![
            bag.id,
            bag.donor_id,
            bag.health_screening_id,
            bag.bank_id,
            bag.blood_type.as_str(),
            bag.component_type.as_deref().unwrap_or("Whole Blood"),
            bag.collection_date,
            bag.expiry_date,
        ],
    )?;
    Ok(())
}

pub fn get_bag(conn: &Connection, id: &str) -> Result<Option<BloodBag>, DatabaseError> {
    let mut stmt = conn.prepare(&format!("SELECT {BAG_COLUMNS} FROM blood_bags WHERE id = ?1"))?;

    let result = stmt.query_row(params![id], bag_row);
    match result {
        Ok(row) => Ok(Some(bag_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Allocatable bags of one blood type in FEFO order (soonest expiry first).
///
/// "Available" alone is not sufficient: a bag released back to the pool after
/// a failed crossmatch may have lapsed in the meantime, so expiry is checked
/// here at selection time rather than trusted from the stored status.
pub fn available_bags(
    conn: &Connection,
    blood_type: BloodType,
    as_of: NaiveDate,
    limit: Option<u32>,
) -> Result<Vec<BloodBag>, DatabaseError> {
    let mut sql = format!(
        "SELECT {BAG_COLUMNS} FROM blood_bags
         WHERE blood_type = ?1 AND status = 'Available' AND expiry_date >= ?2
         ORDER BY expiry_date ASC, id ASC"
    );
    if let Some(n) = limit {
        sql.push_str(&format!(" LIMIT {n}"));
    }

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![blood_type.as_str(), as_of], bag_row)?;

    let mut bags = Vec::new();
    for row in rows {
        bags.push(bag_from_row(row?)?);
    }
    Ok(bags)
}

/// Allocatable bags across every blood type, FEFO order, expiry-guarded.
pub fn available_bags_any_type(
    conn: &Connection,
    as_of: NaiveDate,
) -> Result<Vec<BloodBag>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {BAG_COLUMNS} FROM blood_bags
         WHERE status = 'Available' AND expiry_date >= ?1
         ORDER BY expiry_date ASC, id ASC"
    ))?;
    let rows = stmt.query_map(params![as_of], bag_row)?;

    let mut bags = Vec::new();
    for row in rows {
        bags.push(bag_from_row(row?)?);
    }
    Ok(bags)
}

/// All bags, optionally scoped to one bank, soonest expiry first.
pub fn list_bags(conn: &Connection, bank_id: Option<i64>) -> Result<Vec<BloodBag>, DatabaseError> {
    let sql = match bank_id {
        Some(_) => format!(
            "SELECT {BAG_COLUMNS} FROM blood_bags WHERE bank_id = ?1 ORDER BY expiry_date ASC"
        ),
        None => format!("SELECT {BAG_COLUMNS} FROM blood_bags ORDER BY expiry_date ASC"),
    };

    let mut stmt = conn.prepare(&sql)?;
    let mut bags = Vec::new();
    match bank_id {
        Some(id) => {
            let rows = stmt.query_map(params![id], bag_row)?;
            for row in rows {
                bags.push(bag_from_row(row?)?);
            }
        }
        None => {
            let rows = stmt.query_map([], bag_row)?;
            for row in rows {
                bags.push(bag_from_row(row?)?);
            }
        }
    }
    Ok(bags)
}

pub fn update_bag_status(
    conn: &Connection,
    id: &str,
    status: BagStatus,
) -> Result<(), DatabaseError> {
    let updated = conn.execute(
        "UPDATE blood_bags SET status = ?1 WHERE id = ?2",
        params![status.as_str(), id],
    )?;
    if updated == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "BloodBag".into(),
            id: id.into(),
        });
    }
    Ok(())
}

/// Flip a bag's status only if it currently holds the expected one.
///
/// Returns whether the row transitioned. A `false` under an open transaction
/// means another actor moved the bag first; callers treat that as a conflict
/// and roll back.
pub fn transition_bag_status(
    conn: &Connection,
    id: &str,
    from: BagStatus,
    to: BagStatus,
) -> Result<bool, DatabaseError> {
    let updated = conn.execute(
        "UPDATE blood_bags SET status = ?1 WHERE id = ?2 AND status = ?3",
        params![to.as_str(), id, from.as_str()],
    )?;
    Ok(updated == 1)
}

// Internal row type for BloodBag mapping
struct BagRow {
    id: String,
    donor_id: String,
    health_screening_id: i64,
    bank_id: i64,
    blood_type: String,
    component_type: String,
    collection_date: NaiveDate,
    expiry_date: NaiveDate,
    status: String,
}

fn bag_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<BagRow> {
    Ok(BagRow {
        id: row.get(0)?,
        donor_id: row.get(1)?,
        health_screening_id: row.get(2)?,
        bank_id: row.get(3)?,
        blood_type: row.get(4)?,
        component_type: row.get(5)?,
        collection_date: row.get(6)?,
        expiry_date: row.get(7)?,
        status: row.get(8)?,
    })
}

fn bag_from_row(row: BagRow) -> Result<BloodBag, DatabaseError> {
    Ok(BloodBag {
        id: row.id,
        donor_id: row.donor_id,
        health_screening_id: row.health_screening_id,
        bank_id: row.bank_id,
        blood_type: BloodType::from_str(&row.blood_type)?,
        component_type: row.component_type,
        collection_date: row.collection_date,
        expiry_date: row.expiry_date,
        status: BagStatus::from_str(&row.status)?,
    })
}
