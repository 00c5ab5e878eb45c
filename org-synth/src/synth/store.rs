//! SQLite employee table
//!
//! One file per phase output, each holding a single `employees` table whose
//! column set grows phase over phase:
//!
//! | Stage        | Columns                                              |
//! |--------------|------------------------------------------------------|
//! | `Roster`     | Name, User_ID, Team, Dept_ID, Rank, Title            |
//! | `WithSkills` | + Hard_Skills (`Skill(level), Skill(level)`)         |
//! | `WithStyles` | + Communication_Style (JSON object as text)          |
//!
//! Later phases read the previous stage's file, operate, and write their own.
//! Reading a file that lacks a column the requested stage needs fails with
//! [`SynthError::SchemaMismatch`].

use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;

use crate::error::SynthError;
use crate::synth::types::{Employee, HardSkill, Rank, StyleVector};

const TABLE: &str = "employees";

/// Which columns a file carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreStage {
    Roster,
    WithSkills,
    WithStyles,
}

impl StoreStage {
    pub fn columns(self) -> &'static [&'static str] {
        static ALL: [&str; 8] = [
            "Name",
            "User_ID",
            "Team",
            "Dept_ID",
            "Rank",
            "Title",
            "Hard_Skills",
            "Communication_Style",
        ];
        match self {
            StoreStage::Roster => &ALL[..6],
            StoreStage::WithSkills => &ALL[..7],
            StoreStage::WithStyles => &ALL[..],
        }
    }
}

/// Skill names go into a comma-separated column, so they may not contain one
pub fn is_storable_skill(name: &str) -> bool {
    !name.contains(',')
}

/// Render skills as `Skill(level), Skill(level)`
pub fn format_hard_skills(skills: &[HardSkill]) -> String {
    skills
        .iter()
        .map(|s| format!("{}({})", s.skill, s.proficiency))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse the `Skill(level), Skill(level)` form; items without a level are skipped
pub fn parse_hard_skills(raw: &str) -> Result<Vec<HardSkill>, String> {
    let mut skills = Vec::new();
    for item in raw.split(", ").map(str::trim).filter(|s| !s.is_empty()) {
        let (Some(open), Some(close)) = (item.rfind('('), item.rfind(')')) else {
            continue;
        };
        if close < open {
            continue;
        }
        let proficiency = item[open + 1..close].parse()?;
        skills.push(HardSkill::new(item[..open].trim(), proficiency));
    }
    Ok(skills)
}

/// Connection to one employee file
pub struct EmployeeTable {
    conn: Connection,
    source: String,
}

impl EmployeeTable {
    /// Open (creating if needed) the file at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open employee store: {}", path.display()))?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self {
            conn,
            source: path.display().to_string(),
        })
    }

    /// Open an existing file; a missing file is an error, not an empty table
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.exists() {
            anyhow::bail!("Employee store not found: {}", path.display());
        }
        Self::open(path)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
            source: ":memory:".to_string(),
        })
    }

    /// Replace the table with `employees`, using the columns of `stage`
    pub fn write_all(&mut self, employees: &[Employee], stage: StoreStage) -> Result<()> {
        let columns = stage.columns();
        let column_defs = columns
            .iter()
            .map(|c| {
                if *c == "Rank" {
                    format!("{} INTEGER NOT NULL", c)
                } else {
                    format!("{} TEXT NOT NULL", c)
                }
            })
            .collect::<Vec<_>>()
            .join(",\n                ");

        let tx = self.conn.transaction()?;
        tx.execute_batch(&format!(
            r#"
            DROP TABLE IF EXISTS {table};
            CREATE TABLE {table} (
                {defs}
            );
            "#,
            table = TABLE,
            defs = column_defs
        ))?;

        {
            let placeholders = (1..=columns.len())
                .map(|i| format!("?{}", i))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                TABLE,
                columns.join(", "),
                placeholders
            );
            let mut stmt = tx.prepare(&sql)?;

            for e in employees {
                let rank = i64::from(e.rank.as_u8());
                match stage {
                    StoreStage::Roster => {
                        stmt.execute(params![e.name, e.user_id, e.team, e.dept_id, rank, e.title])?;
                    }
                    StoreStage::WithSkills => {
                        stmt.execute(params![
                            e.name,
                            e.user_id,
                            e.team,
                            e.dept_id,
                            rank,
                            e.title,
                            format_hard_skills(&e.hard_skills)
                        ])?;
                    }
                    StoreStage::WithStyles => {
                        let style = serde_json::to_string(
                            &e.communication_style.clone().unwrap_or_default(),
                        )?;
                        stmt.execute(params![
                            e.name,
                            e.user_id,
                            e.team,
                            e.dept_id,
                            rank,
                            e.title,
                            format_hard_skills(&e.hard_skills),
                            style
                        ])?;
                    }
                }
            }
        }

        tx.commit()?;
        Ok(())
    }

    /// Columns present in the table; empty when the table does not exist
    pub fn columns(&self) -> Result<HashSet<String>> {
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", TABLE))?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<HashSet<_>>>()?;
        Ok(names)
    }

    /// Read every row in insertion order, requiring the columns of `stage`
    pub fn read_all(&self, stage: StoreStage) -> Result<Vec<Employee>> {
        let present = self.columns()?;
        if present.is_empty() {
            return Err(SynthError::schema(&self.source, format!("no '{}' table", TABLE)).into());
        }
        let missing: Vec<&str> = stage
            .columns()
            .iter()
            .copied()
            .filter(|c| !present.contains(*c))
            .collect();
        if !missing.is_empty() {
            return Err(SynthError::schema(
                &self.source,
                format!("missing columns: {}", missing.join(", ")),
            )
            .into());
        }

        let columns = stage.columns();
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY rowid",
            columns.join(", "),
            TABLE
        ))?;

        type RawRow = (String, String, String, String, i64, String, Option<String>, Option<String>);
        let has_skills = columns.len() > 6;
        let has_styles = columns.len() > 7;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    if has_skills { row.get(6)? } else { None },
                    if has_styles { row.get(7)? } else { None },
                ))
            })?
            .collect::<rusqlite::Result<Vec<RawRow>>>()?;

        let mut employees = Vec::with_capacity(rows.len());
        for (name, user_id, team, dept_id, rank, title, skills, style) in rows {
            let rank = u8::try_from(rank)
                .map_err(|e| e.to_string())
                .and_then(Rank::try_from)
                .map_err(|e| SynthError::schema(&self.source, format!("{}: {}", name, e)))?;
            let hard_skills = match skills {
                Some(raw) => parse_hard_skills(&raw)
                    .map_err(|e| SynthError::schema(&self.source, format!("{}: {}", name, e)))?,
                None => Vec::new(),
            };
            let communication_style = match style {
                Some(raw) => Some(serde_json::from_str::<StyleVector>(&raw).map_err(|e| {
                    SynthError::schema(
                        &self.source,
                        format!("{}: invalid Communication_Style: {}", name, e),
                    )
                })?),
                None => None,
            };
            employees.push(Employee {
                name,
                user_id,
                team,
                dept_id,
                rank,
                title,
                hard_skills,
                communication_style,
            });
        }
        Ok(employees)
    }
}

/// Write `employees` to `path` as `stage`, replacing any previous content
pub fn write_employees(path: &Path, employees: &[Employee], stage: StoreStage) -> Result<()> {
    let mut table = EmployeeTable::open(path)?;
    table
        .write_all(employees, stage)
        .with_context(|| format!("Failed to write employee store: {}", path.display()))
}

/// Read the employees of a previous phase's file
pub fn read_employees(path: &Path, stage: StoreStage) -> Result<Vec<Employee>> {
    EmployeeTable::open_existing(path)?.read_all(stage)
}
