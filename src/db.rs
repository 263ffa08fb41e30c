use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;

use crate::error::{StorageError, StorageResult};
use crate::models::{
    Comment, Machine, Photo, ResolutionTrack, Role, Staff, Ticket, TicketDraft, TrackKind,
    TrackStatus,
};

const SCHEMA_VERSION: i32 = 1;

/// Ticket row with the machine reference eagerly joined.
const TICKET_SELECT: &str = "\
    SELECT t.id, t.created_at, t.full_name, t.phone, t.machine_number, \
           t.client_photo, t.issue_description, \
           t.engineer_id, t.engineer_status, t.engineer_closed_at, t.engineer_closed_by, \
           t.accountant_id, t.accountant_status, t.accountant_closed_at, t.accountant_closed_by, \
           m.number, m.name, m.model, m.address, m.priority, m.pump, m.saturday, m.sunday, m.ip \
    FROM tickets t LEFT JOIN machines m ON m.number = t.machine_number";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> StorageResult<()> {
        let version: i32 = self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap_or(0);

        if version < SCHEMA_VERSION {
            self.conn.execute_batch(
                r#"
                CREATE TABLE IF NOT EXISTS machines (
                    number TEXT PRIMARY KEY,
                    name TEXT,
                    model TEXT,
                    address TEXT NOT NULL,
                    priority INTEGER,
                    pump INTEGER,
                    saturday INTEGER,
                    sunday INTEGER,
                    ip TEXT
                );

                CREATE TABLE IF NOT EXISTS staff (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    chat_id INTEGER NOT NULL UNIQUE,
                    full_name TEXT NOT NULL,
                    role TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS tickets (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    created_at TEXT NOT NULL,
                    full_name TEXT NOT NULL,
                    phone TEXT NOT NULL,
                    machine_number TEXT NOT NULL,
                    client_photo TEXT,
                    issue_description TEXT,
                    engineer_id INTEGER,
                    engineer_status TEXT NOT NULL DEFAULT 'open',
                    engineer_closed_at TEXT,
                    engineer_closed_by TEXT,
                    accountant_id INTEGER,
                    accountant_status TEXT NOT NULL DEFAULT 'open',
                    accountant_closed_at TEXT,
                    accountant_closed_by TEXT,
                    FOREIGN KEY (machine_number) REFERENCES machines(number),
                    FOREIGN KEY (engineer_id) REFERENCES staff(id),
                    FOREIGN KEY (accountant_id) REFERENCES staff(id)
                );

                -- Staff-submitted evidence, distinct from the client intake photo
                CREATE TABLE IF NOT EXISTS photos (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    ticket_id INTEGER NOT NULL,
                    media_ref TEXT NOT NULL,
                    FOREIGN KEY (ticket_id) REFERENCES tickets(id) ON DELETE CASCADE
                );

                CREATE TABLE IF NOT EXISTS comments (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    ticket_id INTEGER NOT NULL,
                    text TEXT NOT NULL,
                    author_role TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (ticket_id) REFERENCES tickets(id) ON DELETE CASCADE
                );

                -- One in_work ticket per staff member per track, enforced in
                -- storage so a racing double-claim cannot slip past the
                -- application-level check.
                CREATE UNIQUE INDEX IF NOT EXISTS idx_engineer_active
                    ON tickets(engineer_id) WHERE engineer_status = 'in_work';
                CREATE UNIQUE INDEX IF NOT EXISTS idx_accountant_active
                    ON tickets(accountant_id) WHERE accountant_status = 'in_work';

                CREATE INDEX IF NOT EXISTS idx_tickets_engineer_status ON tickets(engineer_status);
                CREATE INDEX IF NOT EXISTS idx_tickets_accountant_status ON tickets(accountant_status);
                CREATE INDEX IF NOT EXISTS idx_photos_ticket ON photos(ticket_id);
                CREATE INDEX IF NOT EXISTS idx_comments_ticket ON comments(ticket_id);
                "#,
            )?;

            self.conn
                .execute(&format!("PRAGMA user_version = {}", SCHEMA_VERSION), [])?;
        }

        self.conn.execute("PRAGMA foreign_keys = ON", [])?;

        Ok(())
    }

    // Machines (pre-provisioned reference data)

    pub fn insert_machine(&self, machine: &Machine) -> StorageResult<()> {
        self.conn.execute(
            "INSERT INTO machines (number, name, model, address, priority, pump, saturday, sunday, ip) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                machine.number,
                machine.name,
                machine.model,
                machine.address,
                machine.priority,
                machine.pump,
                machine.saturday,
                machine.sunday,
                machine.ip,
            ],
        )?;
        Ok(())
    }

    pub fn machine_exists(&self, number: &str) -> StorageResult<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM machines WHERE number = ?1",
                [number],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn get_machine(&self, number: &str) -> StorageResult<Option<Machine>> {
        let machine = self
            .conn
            .query_row(
                "SELECT number, name, model, address, priority, pump, saturday, sunday, ip \
                 FROM machines WHERE number = ?1",
                [number],
                |row| machine_from_row(row, 0),
            )
            .optional()?;
        Ok(machine)
    }

    // Staff (fixed reference data; the auth lookup resolves a transport
    // identity to an optional staff member)

    pub fn insert_staff(&self, chat_id: i64, full_name: &str, role: Role) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO staff (chat_id, full_name, role) VALUES (?1, ?2, ?3)",
            params![chat_id, full_name, role.as_str()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn staff_by_chat_id(&self, chat_id: i64) -> StorageResult<Option<Staff>> {
        let staff = self
            .conn
            .query_row(
                "SELECT id, chat_id, full_name, role FROM staff WHERE chat_id = ?1",
                [chat_id],
                staff_from_row,
            )
            .optional()?;
        Ok(staff)
    }

    pub fn list_staff_by_roles(&self, roles: &[Role]) -> StorageResult<Vec<Staff>> {
        if roles.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; roles.len()].join(", ");
        let sql = format!(
            "SELECT id, chat_id, full_name, role FROM staff WHERE role IN ({placeholders}) ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let staff = stmt
            .query_map(
                params_from_iter(roles.iter().map(Role::as_str)),
                staff_from_row,
            )?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(staff)
    }

    // Tickets

    pub fn create_ticket(&self, draft: &TicketDraft) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO tickets (created_at, full_name, phone, machine_number, client_photo, issue_description) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                now,
                draft.full_name,
                draft.phone,
                draft.machine_number,
                draft.client_photo,
                draft.issue_description,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_ticket(&self, id: i64) -> StorageResult<Option<Ticket>> {
        let sql = format!("{TICKET_SELECT} WHERE t.id = ?1");
        let ticket = self
            .conn
            .query_row(&sql, [id], ticket_from_row)
            .optional()?;
        Ok(ticket)
    }

    /// The unique `in_work` ticket owned by this staff member on the given
    /// track, if any.
    pub fn find_active_ticket(
        &self,
        staff_id: i64,
        kind: TrackKind,
    ) -> StorageResult<Option<Ticket>> {
        let p = kind.column_prefix();
        let sql = format!(
            "{TICKET_SELECT} WHERE t.{p}_id = ?1 AND t.{p}_status = 'in_work'"
        );
        let ticket = self
            .conn
            .query_row(&sql, [staff_id], ticket_from_row)
            .optional()?;
        Ok(ticket)
    }

    // Track transitions. Each is a single compare-and-swap UPDATE guarded by
    // the expected current status; a lost race shows up as zero rows changed.

    pub fn claim_track(&self, id: i64, kind: TrackKind, staff_id: i64) -> StorageResult<bool> {
        let p = kind.column_prefix();
        let rows = self.conn.execute(
            &format!(
                "UPDATE tickets SET {p}_id = ?1, {p}_status = 'in_work' \
                 WHERE id = ?2 AND {p}_status = 'open'"
            ),
            params![staff_id, id],
        )?;
        Ok(rows > 0)
    }

    pub fn release_track(&self, id: i64, kind: TrackKind, staff_id: i64) -> StorageResult<bool> {
        let p = kind.column_prefix();
        let rows = self.conn.execute(
            &format!(
                "UPDATE tickets SET {p}_id = NULL, {p}_status = 'open' \
                 WHERE id = ?1 AND {p}_id = ?2 AND {p}_status = 'in_work'"
            ),
            params![id, staff_id],
        )?;
        Ok(rows > 0)
    }

    /// Sets status, closed-at and closed-by together; the triple is never
    /// half-written.
    pub fn close_track(
        &self,
        id: i64,
        kind: TrackKind,
        staff_id: i64,
        closed_by: &str,
    ) -> StorageResult<bool> {
        let p = kind.column_prefix();
        let now = Utc::now().to_rfc3339();
        let rows = self.conn.execute(
            &format!(
                "UPDATE tickets SET {p}_status = 'closed', {p}_closed_at = ?1, {p}_closed_by = ?2 \
                 WHERE id = ?3 AND {p}_id = ?4 AND {p}_status = 'in_work'"
            ),
            params![now, closed_by, id, staff_id],
        )?;
        Ok(rows > 0)
    }

    /// Resumes a closed track directly to `in_work`, keeping the assignment.
    /// Closed-at/closed-by are deliberately left in place; the next close
    /// overwrites them.
    pub fn reopen_track(&self, id: i64, kind: TrackKind, staff_id: i64) -> StorageResult<bool> {
        let p = kind.column_prefix();
        let rows = self.conn.execute(
            &format!(
                "UPDATE tickets SET {p}_status = 'in_work' \
                 WHERE id = ?1 AND {p}_id = ?2 AND {p}_status = 'closed'"
            ),
            params![id, staff_id],
        )?;
        Ok(rows > 0)
    }

    // Listings

    /// Tickets whose given track is still `open` (unclaimed).
    pub fn list_open_for(&self, kind: TrackKind) -> StorageResult<Vec<Ticket>> {
        let p = kind.column_prefix();
        let sql = format!("{TICKET_SELECT} WHERE t.{p}_status = 'open' ORDER BY t.id");
        self.query_tickets(&sql, [])
    }

    /// Tickets this staff member closed on the given track.
    pub fn list_closed_by(&self, kind: TrackKind, staff_id: i64) -> StorageResult<Vec<Ticket>> {
        let p = kind.column_prefix();
        let sql = format!(
            "{TICKET_SELECT} WHERE t.{p}_id = ?1 AND t.{p}_status = 'closed' ORDER BY t.id"
        );
        self.query_tickets(&sql, [staff_id])
    }

    /// Manager union view: tickets with at least one track not yet closed.
    pub fn list_any_open(&self) -> StorageResult<Vec<Ticket>> {
        let sql = format!(
            "{TICKET_SELECT} WHERE t.engineer_status != 'closed' OR t.accountant_status != 'closed' \
             ORDER BY t.id"
        );
        self.query_tickets(&sql, [])
    }

    /// Tickets resolved on both tracks.
    pub fn list_fully_closed(&self) -> StorageResult<Vec<Ticket>> {
        let sql = format!(
            "{TICKET_SELECT} WHERE t.engineer_status = 'closed' AND t.accountant_status = 'closed' \
             ORDER BY t.id"
        );
        self.query_tickets(&sql, [])
    }

    /// Whole-table snapshot for the report exporter.
    pub fn list_all(&self) -> StorageResult<Vec<Ticket>> {
        let sql = format!("{TICKET_SELECT} ORDER BY t.id");
        self.query_tickets(&sql, [])
    }

    fn query_tickets<P: rusqlite::Params>(&self, sql: &str, params: P) -> StorageResult<Vec<Ticket>> {
        let mut stmt = self.conn.prepare(sql)?;
        let tickets = stmt
            .query_map(params, ticket_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tickets)
    }

    // Photos and comments (append-only)

    pub fn add_photo(&self, ticket_id: i64, media_ref: &str) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO photos (ticket_id, media_ref) VALUES (?1, ?2)",
            params![ticket_id, media_ref],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn add_comment(&self, ticket_id: i64, text: &str, role: Role) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO comments (ticket_id, text, author_role, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![ticket_id, text, role.as_str(), now],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn photos(&self, ticket_id: i64) -> StorageResult<Vec<Photo>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, ticket_id, media_ref FROM photos WHERE ticket_id = ?1 ORDER BY id")?;
        let photos = stmt
            .query_map([ticket_id], |row| {
                Ok(Photo {
                    id: row.get(0)?,
                    ticket_id: row.get(1)?,
                    media_ref: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(photos)
    }

    pub fn comments(&self, ticket_id: i64) -> StorageResult<Vec<Comment>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, ticket_id, text, author_role, created_at FROM comments \
             WHERE ticket_id = ?1 ORDER BY id",
        )?;
        let comments = stmt
            .query_map([ticket_id], |row| {
                Ok(Comment {
                    id: row.get(0)?,
                    ticket_id: row.get(1)?,
                    text: row.get(2)?,
                    author_role: parse_role(row.get::<_, String>(3)?, 3)?,
                    created_at: parse_datetime(row.get::<_, String>(4)?),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(comments)
    }
}

fn staff_from_row(row: &Row<'_>) -> rusqlite::Result<Staff> {
    Ok(Staff {
        id: row.get(0)?,
        chat_id: row.get(1)?,
        full_name: row.get(2)?,
        role: parse_role(row.get::<_, String>(3)?, 3)?,
    })
}

fn machine_from_row(row: &Row<'_>, base: usize) -> rusqlite::Result<Machine> {
    Ok(Machine {
        number: row.get(base)?,
        name: row.get(base + 1)?,
        model: row.get(base + 2)?,
        address: row.get(base + 3)?,
        priority: row.get(base + 4)?,
        pump: row.get(base + 5)?,
        saturday: row.get(base + 6)?,
        sunday: row.get(base + 7)?,
        ip: row.get(base + 8)?,
    })
}

fn ticket_from_row(row: &Row<'_>) -> rusqlite::Result<Ticket> {
    // Machine columns are NULL when the reference row is gone; the ticket is
    // still returned.
    let machine = match row.get::<_, Option<String>>(15)? {
        Some(_) => Some(machine_from_row(row, 15)?),
        None => None,
    };
    Ok(Ticket {
        id: row.get(0)?,
        created_at: parse_datetime(row.get::<_, String>(1)?),
        full_name: row.get(2)?,
        phone: row.get(3)?,
        machine_number: row.get(4)?,
        client_photo: row.get(5)?,
        issue_description: row.get(6)?,
        engineer: track_from_row(row, 7)?,
        accountant: track_from_row(row, 11)?,
        machine,
    })
}

fn track_from_row(row: &Row<'_>, base: usize) -> rusqlite::Result<ResolutionTrack> {
    let status_raw: String = row.get(base + 1)?;
    let status = TrackStatus::parse(&status_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            base + 1,
            rusqlite::types::Type::Text,
            format!("unknown track status '{status_raw}'").into(),
        )
    })?;
    Ok(ResolutionTrack {
        status,
        assigned_to: row.get(base)?,
        closed_at: row.get::<_, Option<String>>(base + 2)?.map(parse_datetime),
        closed_by: row.get(base + 3)?,
    })
}

fn parse_role(raw: String, column: usize) -> rusqlite::Result<Role> {
    Role::parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            format!("unknown role '{raw}'").into(),
        )
    })
}

fn parse_datetime(s: String) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::tempdir;

    pub(crate) fn setup_test_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(&db_path).unwrap();
        (db, dir)
    }

    pub(crate) fn test_machine(number: &str) -> Machine {
        Machine {
            number: number.to_string(),
            name: Some("Coffee corner".to_string()),
            model: Some("Unicum Rosso".to_string()),
            address: "12 Main St".to_string(),
            priority: Some(1),
            pump: Some(true),
            saturday: Some(true),
            sunday: Some(false),
            ip: Some("Ivanov I.I.".to_string()),
        }
    }

    pub(crate) fn test_draft(machine_number: &str) -> TicketDraft {
        TicketDraft {
            machine_number: machine_number.to_string(),
            client_photo: None,
            full_name: "Anna Petrova".to_string(),
            phone: "+79991234567".to_string(),
            issue_description: None,
        }
    }

    #[test]
    fn machine_existence_check() {
        let (db, _dir) = setup_test_db();
        db.insert_machine(&test_machine("0078")).unwrap();
        assert!(db.machine_exists("0078").unwrap());
        assert!(!db.machine_exists("9999").unwrap());
    }

    #[test]
    fn new_ticket_has_both_tracks_open() {
        let (db, _dir) = setup_test_db();
        db.insert_machine(&test_machine("0078")).unwrap();
        let id = db.create_ticket(&test_draft("0078")).unwrap();
        let ticket = db.get_ticket(id).unwrap().unwrap();
        assert_eq!(ticket.engineer.status, TrackStatus::Open);
        assert_eq!(ticket.accountant.status, TrackStatus::Open);
        assert!(ticket.engineer.assigned_to.is_none());
        assert!(ticket.accountant.assigned_to.is_none());
        assert!(ticket.engineer.closed_at.is_none());
        assert!(ticket.machine.is_some());
    }

    #[test]
    fn claim_is_compare_and_swap() {
        let (db, _dir) = setup_test_db();
        db.insert_machine(&test_machine("0078")).unwrap();
        let id = db.create_ticket(&test_draft("0078")).unwrap();
        let eng = db.insert_staff(100, "Boris", Role::Engineer).unwrap();
        assert!(db.claim_track(id, TrackKind::Engineer, eng).unwrap());
        // Second claim finds the track no longer open.
        let eng2 = db.insert_staff(101, "Viktor", Role::Engineer).unwrap();
        assert!(!db.claim_track(id, TrackKind::Engineer, eng2).unwrap());
        let ticket = db.get_ticket(id).unwrap().unwrap();
        assert_eq!(ticket.engineer.assigned_to, Some(eng));
    }

    #[test]
    fn partial_unique_index_blocks_second_active_ticket() {
        let (db, _dir) = setup_test_db();
        db.insert_machine(&test_machine("0078")).unwrap();
        let first = db.create_ticket(&test_draft("0078")).unwrap();
        let second = db.create_ticket(&test_draft("0078")).unwrap();
        let eng = db.insert_staff(100, "Boris", Role::Engineer).unwrap();
        assert!(db.claim_track(first, TrackKind::Engineer, eng).unwrap());
        // Bypasses the application-level check on purpose; storage still
        // refuses the second in_work row for the same staff id.
        let err = db.claim_track(second, TrackKind::Engineer, eng).unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn same_staff_id_may_hold_both_tracks_of_one_ticket() {
        let (db, _dir) = setup_test_db();
        db.insert_machine(&test_machine("0078")).unwrap();
        let id = db.create_ticket(&test_draft("0078")).unwrap();
        let eng = db.insert_staff(100, "Boris", Role::Engineer).unwrap();
        let acc = db.insert_staff(200, "Olga", Role::Accountant).unwrap();
        assert!(db.claim_track(id, TrackKind::Engineer, eng).unwrap());
        assert!(db.claim_track(id, TrackKind::Accountant, acc).unwrap());
    }

    #[test]
    fn close_sets_metadata_together_and_only_for_one_track() {
        let (db, _dir) = setup_test_db();
        db.insert_machine(&test_machine("0078")).unwrap();
        let id = db.create_ticket(&test_draft("0078")).unwrap();
        let eng = db.insert_staff(100, "Boris", Role::Engineer).unwrap();
        db.claim_track(id, TrackKind::Engineer, eng).unwrap();
        assert!(db.close_track(id, TrackKind::Engineer, eng, "Boris").unwrap());
        let ticket = db.get_ticket(id).unwrap().unwrap();
        assert_eq!(ticket.engineer.status, TrackStatus::Closed);
        assert!(ticket.engineer.closed_at.is_some());
        assert_eq!(ticket.engineer.closed_by.as_deref(), Some("Boris"));
        assert_eq!(ticket.accountant.status, TrackStatus::Open);
        assert!(ticket.accountant.closed_at.is_none());
    }

    #[test]
    fn close_requires_ownership() {
        let (db, _dir) = setup_test_db();
        db.insert_machine(&test_machine("0078")).unwrap();
        let id = db.create_ticket(&test_draft("0078")).unwrap();
        let eng = db.insert_staff(100, "Boris", Role::Engineer).unwrap();
        let other = db.insert_staff(101, "Viktor", Role::Engineer).unwrap();
        db.claim_track(id, TrackKind::Engineer, eng).unwrap();
        assert!(!db.close_track(id, TrackKind::Engineer, other, "Viktor").unwrap());
    }

    #[test]
    fn release_returns_track_to_open() {
        let (db, _dir) = setup_test_db();
        db.insert_machine(&test_machine("0078")).unwrap();
        let id = db.create_ticket(&test_draft("0078")).unwrap();
        let eng = db.insert_staff(100, "Boris", Role::Engineer).unwrap();
        db.claim_track(id, TrackKind::Engineer, eng).unwrap();
        assert!(db.release_track(id, TrackKind::Engineer, eng).unwrap());
        let ticket = db.get_ticket(id).unwrap().unwrap();
        assert_eq!(ticket.engineer.status, TrackStatus::Open);
        assert!(ticket.engineer.assigned_to.is_none());
    }

    #[test]
    fn reopen_goes_back_to_in_work() {
        let (db, _dir) = setup_test_db();
        db.insert_machine(&test_machine("0078")).unwrap();
        let id = db.create_ticket(&test_draft("0078")).unwrap();
        let eng = db.insert_staff(100, "Boris", Role::Engineer).unwrap();
        db.claim_track(id, TrackKind::Engineer, eng).unwrap();
        db.close_track(id, TrackKind::Engineer, eng, "Boris").unwrap();
        assert!(db.reopen_track(id, TrackKind::Engineer, eng).unwrap());
        let ticket = db.get_ticket(id).unwrap().unwrap();
        assert_eq!(ticket.engineer.status, TrackStatus::InWork);
        // Closure metadata stays until the next close overwrites it.
        assert!(ticket.engineer.closed_at.is_some());
        assert_eq!(ticket.engineer.closed_by.as_deref(), Some("Boris"));
    }

    #[test]
    fn find_active_ticket_by_track() {
        let (db, _dir) = setup_test_db();
        db.insert_machine(&test_machine("0078")).unwrap();
        let id = db.create_ticket(&test_draft("0078")).unwrap();
        let eng = db.insert_staff(100, "Boris", Role::Engineer).unwrap();
        assert!(db.find_active_ticket(eng, TrackKind::Engineer).unwrap().is_none());
        db.claim_track(id, TrackKind::Engineer, eng).unwrap();
        let active = db.find_active_ticket(eng, TrackKind::Engineer).unwrap().unwrap();
        assert_eq!(active.id, id);
        assert!(db.find_active_ticket(eng, TrackKind::Accountant).unwrap().is_none());
    }

    #[test]
    fn listing_filters() {
        let (db, _dir) = setup_test_db();
        db.insert_machine(&test_machine("0078")).unwrap();
        let a = db.create_ticket(&test_draft("0078")).unwrap();
        let b = db.create_ticket(&test_draft("0078")).unwrap();
        let eng = db.insert_staff(100, "Boris", Role::Engineer).unwrap();
        let acc = db.insert_staff(200, "Olga", Role::Accountant).unwrap();

        // Fully resolve ticket a.
        db.claim_track(a, TrackKind::Engineer, eng).unwrap();
        db.close_track(a, TrackKind::Engineer, eng, "Boris").unwrap();
        db.claim_track(a, TrackKind::Accountant, acc).unwrap();
        db.close_track(a, TrackKind::Accountant, acc, "Olga").unwrap();

        // Ticket b: engineer track closed, accountant track open.
        db.claim_track(b, TrackKind::Engineer, eng).unwrap();
        db.close_track(b, TrackKind::Engineer, eng, "Boris").unwrap();

        let open_eng = db.list_open_for(TrackKind::Engineer).unwrap();
        assert!(open_eng.is_empty());
        let open_acc = db.list_open_for(TrackKind::Accountant).unwrap();
        assert_eq!(open_acc.iter().map(|t| t.id).collect::<Vec<_>>(), vec![b]);

        // Half-resolved ticket counts as open for managers, not closed.
        let any_open = db.list_any_open().unwrap();
        assert_eq!(any_open.iter().map(|t| t.id).collect::<Vec<_>>(), vec![b]);
        let fully = db.list_fully_closed().unwrap();
        assert_eq!(fully.iter().map(|t| t.id).collect::<Vec<_>>(), vec![a]);

        let closed_by_eng = db.list_closed_by(TrackKind::Engineer, eng).unwrap();
        assert_eq!(closed_by_eng.len(), 2);

        assert_eq!(db.list_all().unwrap().len(), 2);
    }

    #[test]
    fn photos_and_comments_are_ordered() {
        let (db, _dir) = setup_test_db();
        db.insert_machine(&test_machine("0078")).unwrap();
        let id = db.create_ticket(&test_draft("0078")).unwrap();
        db.add_photo(id, "file-1").unwrap();
        db.add_photo(id, "file-2").unwrap();
        db.add_comment(id, "checked the pump", Role::Engineer).unwrap();
        db.add_comment(id, "refund issued", Role::Accountant).unwrap();

        let photos = db.photos(id).unwrap();
        assert_eq!(
            photos.iter().map(|p| p.media_ref.as_str()).collect::<Vec<_>>(),
            vec!["file-1", "file-2"]
        );
        let comments = db.comments(id).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].author_role, Role::Engineer);
        assert_eq!(comments[1].author_role, Role::Accountant);
    }

    #[test]
    fn staff_lookup_by_chat_id_and_roles() {
        let (db, _dir) = setup_test_db();
        db.insert_staff(100, "Boris", Role::Engineer).unwrap();
        db.insert_staff(200, "Olga", Role::Accountant).unwrap();
        db.insert_staff(300, "Dmitri", Role::Manager).unwrap();

        let staff = db.staff_by_chat_id(200).unwrap().unwrap();
        assert_eq!(staff.full_name, "Olga");
        assert_eq!(staff.role, Role::Accountant);
        assert!(db.staff_by_chat_id(999).unwrap().is_none());

        let field = db
            .list_staff_by_roles(&[Role::Engineer, Role::Accountant])
            .unwrap();
        assert_eq!(field.len(), 2);
        let everyone = db
            .list_staff_by_roles(&[Role::Engineer, Role::Accountant, Role::Manager])
            .unwrap();
        assert_eq!(everyone.len(), 3);
        assert!(db.list_staff_by_roles(&[]).unwrap().is_empty());
    }
}
