/// Assessment Audit Trail (ISO 21434)
///
/// Tamper-evident record of engine decisions using chained hashing. Each
/// entry includes the hash of the previous entry, so modified or deleted
/// entries are detectable when the file is verified.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

/// Engine decisions worth auditing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "details")]
pub enum AssessmentEvent {
    /// Store opened for a project
    ProjectOpened { project_id: u64, name: String },

    /// Asset record created
    AssetCreated {
        asset_pk: u64,
        asset_id: String,
        ai_generated: bool,
    },

    /// AI-generated asset confirmed by a human
    AssetConfirmed { asset_pk: u64 },

    /// Asset deleted with its dependents
    AssetDeleted {
        asset_pk: u64,
        threats_removed: usize,
        relations_removed: usize,
    },

    /// Threat record created
    ThreatCreated {
        threat_pk: u64,
        threat_id: String,
        ai_generated: bool,
    },

    /// Threat classifications recomputed
    ThreatAssessed {
        threat_pk: u64,
        feasibility: Option<String>,
        impact: Option<String>,
        risk_level: Option<u8>,
    },

    /// AI-generated threat confirmed by a human
    ThreatConfirmed { threat_pk: u64 },

    /// Threat deleted with its mitigations
    ThreatDeleted {
        threat_pk: u64,
        mitigations_removed: usize,
    },

    /// Treatment decision recorded on a threat
    TreatmentRecorded { threat_pk: u64, decision: String },

    /// Relation edge added between two assets
    RelationAdded {
        relation_pk: u64,
        source_asset_pk: u64,
        target_asset_pk: u64,
        relation_type: String,
    },
}

/// A single entry in the assessment log with tamper-evident chaining
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentLogEntry {
    /// Sequential entry number
    pub sequence: u64,
    pub timestamp: DateTime<Utc>,
    /// Project this entry belongs to
    pub project_id: u64,
    pub event: AssessmentEvent,
    /// Hash of the previous entry (empty for the first entry)
    pub prev_hash: String,
    /// Hash of this entry, for chain verification
    pub entry_hash: String,
}

impl AssessmentLogEntry {
    fn new(sequence: u64, project_id: u64, event: AssessmentEvent, prev_hash: String) -> Self {
        let timestamp = Utc::now();

        let mut hasher = Sha256::new();
        hasher.update(sequence.to_le_bytes());
        hasher.update(timestamp.to_rfc3339().as_bytes());
        hasher.update(project_id.to_le_bytes());
        hasher.update(serde_json::to_string(&event).unwrap_or_default().as_bytes());
        hasher.update(prev_hash.as_bytes());
        let entry_hash = format!("{:x}", hasher.finalize());

        Self {
            sequence,
            timestamp,
            project_id,
            event,
            prev_hash,
            entry_hash,
        }
    }

    /// Verify this entry's hash is correct
    pub fn verify_hash(&self) -> bool {
        let mut hasher = Sha256::new();
        hasher.update(self.sequence.to_le_bytes());
        hasher.update(self.timestamp.to_rfc3339().as_bytes());
        hasher.update(self.project_id.to_le_bytes());
        hasher.update(
            serde_json::to_string(&self.event)
                .unwrap_or_default()
                .as_bytes(),
        );
        hasher.update(self.prev_hash.as_bytes());

        format!("{:x}", hasher.finalize()) == self.entry_hash
    }

    /// Verify chain link to the previous entry
    pub fn verify_chain(&self, prev_entry: &AssessmentLogEntry) -> bool {
        self.prev_hash == prev_entry.entry_hash && self.sequence == prev_entry.sequence + 1
    }
}

/// Append-only assessment logger writing one JSON object per line
pub struct AssessmentLog {
    project_id: u64,
    log_path: PathBuf,
    writer: Arc<Mutex<BufWriter<File>>>,
    sequence: Arc<Mutex<u64>>,
    last_hash: Arc<Mutex<String>>,
}

impl AssessmentLog {
    /// Create a new log file under `log_dir` (default `./assessment_logs/`)
    pub fn new(project_id: u64, log_dir: Option<PathBuf>) -> std::io::Result<Self> {
        let log_dir = log_dir.unwrap_or_else(|| PathBuf::from("assessment_logs"));
        std::fs::create_dir_all(&log_dir)?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let log_path = log_dir.join(format!("project_{}_{}.jsonl", project_id, timestamp));

        let file = OpenOptions::new().create(true).append(true).open(&log_path)?;

        Ok(Self {
            project_id,
            log_path,
            writer: Arc::new(Mutex::new(BufWriter::new(file))),
            sequence: Arc::new(Mutex::new(0)),
            last_hash: Arc::new(Mutex::new(String::new())),
        })
    }

    /// Append an event to the log
    pub fn log_event(&self, event: AssessmentEvent) {
        let mut seq = self.sequence.lock().unwrap();
        let mut last_hash = self.last_hash.lock().unwrap();

        let entry = AssessmentLogEntry::new(*seq, self.project_id, event, last_hash.clone());

        *seq += 1;
        *last_hash = entry.entry_hash.clone();

        if let Ok(mut writer) = self.writer.lock() {
            if let Ok(json) = serde_json::to_string(&entry) {
                let _ = writeln!(writer, "{}", json);
                let _ = writer.flush();
            }
        }
    }

    pub fn log_path(&self) -> &PathBuf {
        &self.log_path
    }

    pub fn sequence(&self) -> u64 {
        *self.sequence.lock().unwrap()
    }
}

impl Clone for AssessmentLog {
    fn clone(&self) -> Self {
        Self {
            project_id: self.project_id,
            log_path: self.log_path.clone(),
            writer: Arc::clone(&self.writer),
            sequence: Arc::clone(&self.sequence),
            last_hash: Arc::clone(&self.last_hash),
        }
    }
}

impl fmt::Debug for AssessmentLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssessmentLog")
            .field("project_id", &self.project_id)
            .field("log_path", &self.log_path)
            .field("sequence", &self.sequence)
            .finish()
    }
}

/// Result of verifying a log file
#[derive(Debug)]
pub struct LogVerification {
    pub total_entries: usize,
    pub verified: bool,
    pub issues: Vec<String>,
}

/// Verify integrity of an entire log file
pub fn verify_log_file(log_path: PathBuf) -> Result<LogVerification, String> {
    use std::io::{BufRead, BufReader};

    let file = File::open(&log_path).map_err(|e| format!("Failed to open log: {}", e))?;
    let reader = BufReader::new(file);

    let mut entries = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| format!("Line {} read error: {}", line_num + 1, e))?;
        let entry: AssessmentLogEntry = serde_json::from_str(&line)
            .map_err(|e| format!("Line {} parse error: {}", line_num + 1, e))?;
        entries.push(entry);
    }

    if entries.is_empty() {
        return Ok(LogVerification {
            total_entries: 0,
            verified: true,
            issues: Vec::new(),
        });
    }

    let mut issues = Vec::new();

    if !entries[0].prev_hash.is_empty() {
        issues.push(format!(
            "Entry 0: First entry should have empty prev_hash, got '{}'",
            entries[0].prev_hash
        ));
    }

    for (i, entry) in entries.iter().enumerate() {
        if !entry.verify_hash() {
            issues.push(format!("Entry {}: Hash verification failed (tampered)", i));
        }
        if entry.sequence != i as u64 {
            issues.push(format!(
                "Entry {}: Expected sequence {}, got {}",
                i, i, entry.sequence
            ));
        }
    }

    for i in 1..entries.len() {
        if !entries[i].verify_chain(&entries[i - 1]) {
            issues.push(format!(
                "Entry {}: Chain verification failed (missing or reordered entry)",
                i
            ));
        }
    }

    Ok(LogVerification {
        total_entries: entries.len(),
        verified: issues.is_empty(),
        issues,
    })
}
