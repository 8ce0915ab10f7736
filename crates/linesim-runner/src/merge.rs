//! Merged timeline of every machine's log.
//!
//! All step logs and expectation flags are outer-joined into one table keyed
//! by `(time, code, occurrence)`. Flags join at code 0, next to the cycle
//! start of the same tick. `occurrence` numbers repeats of one `(time, code)`
//! within a machine's log, so no two records ever collapse into one row. The
//! `step` column of a repeat carries its occurrence, as in `5.1#1`.
//!
//! Gaps are forward-filled per column. Cells before a column's first value
//! stay blank.

use std::{
    collections::{BTreeMap, HashMap},
    io::Write,
    path::Path,
};

use linesim_core::{SimTime, StepRecord};

use crate::{
    error::RunnerError,
    logs::{MachineLog, write_file},
};

/// Step log columns, in `log.csv` order after the key.
pub const STEP_COLUMNS: [&str; 7] =
    ["input", "time_process", "output", "produced", "failure", "mttf", "repair_time"];

const COLUMNS_PER_MACHINE: usize = STEP_COLUMNS.len() + 1;

/// Row position in the merged timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MergeKey {
    /// Simulated time
    pub time: SimTime,
    /// Step code, 0 for flags
    pub code: u8,
    /// Repeat index of `(time, code)` within one machine
    pub occurrence: u32,
}

impl MergeKey {
    /// `"<time>.<code>"` as in the per-machine logs, with `#<occurrence>`
    /// appended for repeats.
    pub fn step(&self) -> String {
        match self.occurrence {
            0 => format!("{}.{}", self.time, self.code),
            n => format!("{}.{}#{n}", self.time, self.code),
        }
    }
}

/// The merged, forward-filled table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Timeline {
    columns: Vec<String>,
    rows: Vec<(MergeKey, Vec<Option<String>>)>,
}

fn step_cells(record: &StepRecord) -> [String; 7] {
    [
        record.input_level.to_string(),
        record.remaining.to_string(),
        record.output_level.to_string(),
        record.parts_made.to_string(),
        u8::from(record.broken).to_string(),
        record.mttf.to_string(),
        record.repair_time.to_string(),
    ]
}

fn label(name: &str) -> &str {
    name.strip_prefix("Machine ").unwrap_or(name)
}

impl Timeline {
    /// Outer-join `logs` and forward-fill the gaps.
    pub fn merge(logs: &[MachineLog]) -> Self {
        let width = logs.len() * COLUMNS_PER_MACHINE;
        let columns = logs
            .iter()
            .flat_map(|log| {
                let short = label(&log.name);
                STEP_COLUMNS
                    .iter()
                    .map(move |column| format!("{column} {short}"))
                    .chain(std::iter::once(format!("flag {short}")))
            })
            .collect();

        let mut table: BTreeMap<MergeKey, Vec<Option<String>>> = BTreeMap::new();
        for (m, log) in logs.iter().enumerate() {
            let offset = m * COLUMNS_PER_MACHINE;

            let mut seen: HashMap<(SimTime, u8), u32> = HashMap::new();
            for record in &log.steps {
                let code = record.code.code();
                let occurrence = seen.entry((record.time, code)).or_insert(0);
                let key = MergeKey { time: record.time, code, occurrence: *occurrence };
                *occurrence += 1;

                let row = table.entry(key).or_insert_with(|| vec![None; width]);
                for (i, cell) in step_cells(record).into_iter().enumerate() {
                    row[offset + i] = Some(cell);
                }
            }

            for &(time, behind) in &log.flags {
                let key = MergeKey { time, code: 0, occurrence: 0 };
                let row = table.entry(key).or_insert_with(|| vec![None; width]);
                row[offset + STEP_COLUMNS.len()] = Some(u8::from(behind).to_string());
            }
        }

        let mut last: Vec<Option<String>> = vec![None; width];
        let rows = table
            .into_iter()
            .map(|(key, mut row)| {
                for (cell, previous) in row.iter_mut().zip(last.iter_mut()) {
                    if cell.is_some() {
                        previous.clone_from(cell);
                    } else {
                        cell.clone_from(previous);
                    }
                }
                (key, row)
            })
            .collect();

        Self { columns, rows }
    }

    /// Column names after the `step` key.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in key order.
    pub fn rows(&self) -> &[(MergeKey, Vec<Option<String>>)] {
        &self.rows
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// No rows at all.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the table as CSV with a leading `step` column.
    pub fn write_csv(&self, path: &Path) -> Result<(), RunnerError> {
        write_file(path, |out| {
            writeln!(out, "step,{}", self.columns.join(","))?;
            for (key, row) in &self.rows {
                write!(out, "{}", key.step())?;
                for cell in row {
                    write!(out, ",{}", cell.as_deref().unwrap_or(""))?;
                }
                writeln!(out)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use linesim_core::{Plant, StepCode};

    use super::*;

    fn record(plant: &mut Plant, time: SimTime, code: StepCode, parts_made: u64) -> StepRecord {
        let machine =
            plant.machine_by_name("Machine A").unwrap_or_else(|| plant.add_machine("Machine A"));
        StepRecord {
            machine,
            time,
            code,
            input_level: 10,
            remaining: 0,
            output_level: 0,
            parts_made,
            broken: false,
            mttf: 100.0,
            repair_time: 0,
        }
    }

    #[test]
    fn flags_join_cycle_start_and_fill_forward() {
        let mut plant = Plant::new();
        let a = MachineLog {
            name: "Machine A".to_string(),
            steps: vec![
                record(&mut plant, 0, StepCode::CycleStart, 0),
                record(&mut plant, 1, StepCode::InputHandled, 0),
                record(&mut plant, 1, StepCode::ProcessingStarted, 0),
            ],
            flags: vec![(0, false), (1, false), (2, true)],
        };
        let b = MachineLog {
            name: "Machine B".to_string(),
            steps: vec![],
            flags: vec![(1, true)],
        };

        let timeline = Timeline::merge(&[a, b]);

        assert_eq!(timeline.columns().len(), 16);
        assert_eq!(timeline.columns()[0], "input A");
        assert_eq!(timeline.columns()[7], "flag A");
        assert_eq!(timeline.columns()[15], "flag B");

        let steps: Vec<_> = timeline.rows().iter().map(|(key, _)| key.step()).collect();
        assert_eq!(steps, ["0.0", "1.0", "1.5", "1.6", "2.0"]);

        let flag_a: Vec<_> = timeline.rows().iter().map(|(_, row)| row[7].as_deref()).collect();
        assert_eq!(flag_a, [Some("0"), Some("0"), Some("0"), Some("0"), Some("1")]);

        // B has nothing before t=1
        let flag_b: Vec<_> = timeline.rows().iter().map(|(_, row)| row[15].as_deref()).collect();
        assert_eq!(flag_b, [None, Some("1"), Some("1"), Some("1"), Some("1")]);
        assert!(timeline.rows().iter().all(|(_, row)| row[8].is_none()));
    }

    #[test]
    fn repeated_time_and_code_get_separate_rows() {
        let mut plant = Plant::new();
        let log = MachineLog {
            name: "Machine A".to_string(),
            steps: vec![
                record(&mut plant, 5, StepCode::ProcessingStarted, 1),
                record(&mut plant, 5, StepCode::ProcessingStarted, 2),
            ],
            flags: vec![],
        };

        let timeline = Timeline::merge(&[log]);

        let steps: Vec<_> = timeline.rows().iter().map(|(key, _)| key.step()).collect();
        assert_eq!(steps, ["5.6", "5.6#1"]);
        let produced: Vec<_> = timeline.rows().iter().map(|(_, row)| row[3].as_deref()).collect();
        assert_eq!(produced, [Some("1"), Some("2")]);
    }

    #[test]
    fn csv_has_step_column_and_blanks() {
        let log =
            MachineLog { name: "Machine C".to_string(), steps: vec![], flags: vec![(0, true)] };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("merged_logs.csv");

        Timeline::merge(&[log]).write_csv(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "step,input C,time_process C,output C,produced C,\
             failure C,mttf C,repair_time C,flag C\n\
             0.0,,,,,,,,1\n"
        );
    }
}
