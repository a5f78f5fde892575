use std::collections::HashSet;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use super::data::Part;
use super::edit::PartFields;
use crate::error::{CatalogError, Result};
use crate::probe::{DecodingLoader, ImageLoader, ImageProbe};

/// The Library is the record store for the parts catalog.
/// It keeps every record in document order, including soft-deleted ones,
/// and re-probes images after every mutation that can change them.
///
/// Mutating methods take `&mut self` and only return after their probe
/// round has finished, so two mutation+probe cycles can never interleave
/// on one store.
pub struct Library<L = DecodingLoader> {
    parts: Vec<Part>,
    probe: ImageProbe<L>,
    /// Bumped at the start of every probe round
    generation: u64,
}

/// Records a probe round is about to check
struct ProbeRound {
    generation: u64,
    /// (position, locator) as they were when the round started
    targets: Vec<(usize, String)>,
}

impl<L: ImageLoader> Library<L> {
    /// Create an empty library that validates images with `probe`
    pub fn new(probe: ImageProbe<L>) -> Self {
        Library {
            parts: Vec::new(),
            probe,
            generation: 0,
        }
    }

    pub fn probe(&self) -> &ImageProbe<L> {
        &self.probe
    }

    /// Current ordered collection, soft-deleted records included
    pub fn snapshot(&self) -> &[Part] {
        &self.parts
    }

    pub fn get(&self, id: &str) -> Option<&Part> {
        self.parts.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Drop every record
    pub fn clear(&mut self) {
        self.parts.clear();
        // Any round still holding targets is now stale
        self.generation += 1;
    }

    /// Replace the whole collection with a parsed `images.json` document
    ///
    /// On a format error the library is left empty.
    pub async fn load_json(&mut self, json: &str) -> Result<()> {
        match parse_document(json) {
            Ok(records) => {
                self.load(records).await;
                Ok(())
            }
            Err(err) => {
                self.clear();
                Err(err)
            }
        }
    }

    /// Replace the whole collection and validate every image
    ///
    /// Records without an id, or repeating an id already seen earlier in
    /// the document, get a fresh one.
    pub async fn load(&mut self, records: Vec<Part>) {
        self.clear();
        let mut seen = HashSet::with_capacity(records.len());
        for mut part in records {
            part.normalize();
            if part.id.is_empty() || seen.contains(&part.id) {
                let id = self.next_id();
                if !part.id.is_empty() {
                    debug!(repeated = %part.id, %id, "reassigning repeated id");
                }
                part.id = id;
            }
            seen.insert(part.id.clone());
            self.parts.push(part);
        }

        let valid = self.revalidate_all().await;
        info!(records = self.parts.len(), valid, "catalog loaded");
    }

    /// Add a new part from submitted form values
    ///
    /// Returns the stored record once its image has been probed.
    pub async fn add(&mut self, fields: PartFields) -> Result<Part> {
        let fields = fields.trimmed();
        fields.validate()?;
        self.check_duplicate(&fields, None)?;

        let id = self.next_id();
        let mut part = Part {
            id: id.clone(),
            ..Part::default()
        };
        fields.apply_to(&mut part);
        self.parts.push(part);
        let index = self.parts.len() - 1;

        self.revalidate(&[index]).await;
        let part = self.parts[index].clone();
        info!(id = %part.id, image_valid = part.image_valid, "part added");
        Ok(part)
    }

    /// Replace a part's fields in place and re-probe its image
    ///
    /// Editing also clears the soft-delete marker.
    pub async fn update(&mut self, id: &str, fields: PartFields) -> Result<Part> {
        let index = self.index_of(id)?;
        let fields = fields.trimmed();
        fields.validate()?;
        self.check_duplicate(&fields, Some(id))?;

        let part = &mut self.parts[index];
        fields.apply_to(part);
        part.deleted = false;
        part.image_valid = false;

        self.revalidate(&[index]).await;
        let part = self.parts[index].clone();
        info!(id, image_valid = part.image_valid, "part updated");
        Ok(part)
    }

    /// Mark a part deleted. Its fields stay as they are.
    pub fn soft_delete(&mut self, id: &str) -> Result<()> {
        let index = self.index_of(id)?;
        self.parts[index].deleted = true;
        info!(id, "part soft-deleted");
        Ok(())
    }

    /// Merge an imported `images.json` document by id
    ///
    /// The whole document is checked before anything changes.
    pub async fn merge_json(&mut self, json: &str) -> Result<MergeSummary> {
        let records = parse_document(json)?;
        Ok(self.merge(records).await)
    }

    /// Upsert records by id, then re-probe the entire collection
    pub async fn merge(&mut self, records: Vec<Part>) -> MergeSummary {
        let mut summary = MergeSummary::default();

        for mut incoming in records {
            incoming.normalize();
            if incoming.id.is_empty() {
                incoming.id = self.next_id();
            }

            match self.parts.iter_mut().find(|p| p.id == incoming.id) {
                Some(existing) => {
                    existing.merge_from(incoming);
                    summary.replaced += 1;
                }
                None => {
                    self.parts.push(incoming);
                    summary.appended += 1;
                }
            }
        }

        summary.valid = self.revalidate_all().await;
        info!(
            replaced = summary.replaced,
            appended = summary.appended,
            valid = summary.valid,
            "catalog merged"
        );
        summary
    }

    /// Serialize every record, soft-deleted included, without `imageValid`
    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.parts)?)
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.parts
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| CatalogError::NotFound(id.to_string()))
    }

    /// Reject a customer + part number pair already used by another live record
    fn check_duplicate(&self, fields: &PartFields, exclude_id: Option<&str>) -> Result<()> {
        let taken = self.parts.iter().any(|p| {
            !p.deleted
                && Some(p.id.as_str()) != exclude_id
                && p.customer_name() == fields.customer_name
                && p.part_no() == fields.part_no
        });

        if taken {
            Err(CatalogError::Duplicate {
                customer: fields.customer_name.clone(),
                part_no: fields.part_no.clone(),
            })
        } else {
            Ok(())
        }
    }

    /// Fresh timestamp-derived id, bumped until it is unused
    fn next_id(&self) -> String {
        let mut millis = Utc::now().timestamp_millis();
        loop {
            let id = format!("ID{millis}");
            if self.get(&id).is_none() {
                return id;
            }
            millis += 1;
        }
    }

    /// Probe every record. Returns how many came back valid.
    async fn revalidate_all(&mut self) -> usize {
        let positions: Vec<usize> = (0..self.parts.len()).collect();
        self.revalidate(&positions).await
    }

    /// Run one probe round over the records at `positions` and write the
    /// outcomes back
    async fn revalidate(&mut self, positions: &[usize]) -> usize {
        let round = self.begin_round(positions);
        let outcomes = self
            .probe
            .probe_all(round.targets.iter().map(|(_, locator)| locator.as_str()))
            .await;
        let results = round
            .targets
            .into_iter()
            .zip(outcomes)
            .map(|((index, locator), outcome)| (index, locator, outcome.is_valid()))
            .collect();
        self.finish_round(round.generation, results)
    }

    /// Start a round: clear the flags it will recompute and tag it
    fn begin_round(&mut self, positions: &[usize]) -> ProbeRound {
        self.generation += 1;
        let mut targets = Vec::with_capacity(positions.len());
        for &index in positions {
            let Some(part) = self.parts.get_mut(index) else {
                continue;
            };
            part.image_valid = false;
            targets.push((index, part.image_locator().to_string()));
        }
        ProbeRound {
            generation: self.generation,
            targets,
        }
    }

    /// Write a round's outcomes, unless newer data has superseded it
    ///
    /// An outcome is also dropped when its record no longer exists or
    /// points at a different locator than the one probed.
    fn finish_round(&mut self, generation: u64, results: Vec<(usize, String, bool)>) -> usize {
        if generation != self.generation {
            debug!(generation, current = self.generation, "discarding stale probe round");
            return 0;
        }

        let mut valid = 0;
        for (index, locator, is_valid) in results {
            let Some(part) = self.parts.get_mut(index) else {
                continue;
            };
            if part.image_locator() != locator {
                continue;
            }
            part.image_valid = is_valid;
            if is_valid {
                valid += 1;
            }
        }
        valid
    }
}

/// What a merge did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub replaced: usize,
    pub appended: usize,
    /// Records with a valid image after the post-merge probe round
    pub valid: usize,
}

/// Parse an `images.json` document: an array of record objects
fn parse_document(json: &str) -> Result<Vec<Part>> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Array(items) = value else {
        return Err(CatalogError::Format("JSON must be an array".to_string()));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            if !item.is_object() {
                return Err(CatalogError::Format(format!(
                    "record {index} is not an object"
                )));
            }
            serde_json::from_value(item)
                .map_err(|e| CatalogError::Format(format!("record {index}: {e}")))
        })
        .collect()
}

// Implement Debug for better error messages
impl<L> std::fmt::Debug for Library<L> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Library")
            .field("parts", &self.parts.len())
            .field("generation", &self.generation)
            .finish()
    }
}
