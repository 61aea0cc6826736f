use super::Tracker;
use crate::store::Store;
use crate::validation::{validate_medication_patch, validate_new_medication};
use crate::{Error, Medication, MedicationPatch, NewMedication, Result};
use chrono::Utc;
use uuid::Uuid;

impl<S: Store> Tracker<S> {
    /// Add a medication; names are unique (case-insensitive)
    pub fn create_medication(&self, input: &NewMedication) -> Result<Medication> {
        validate_new_medication(input)?;
        let name = input.name.trim().to_string();

        if self.store.get_medication_by_name(&name)?.is_some() {
            return Err(Error::DuplicateName(name));
        }

        let medication = Medication {
            id: Uuid::new_v4(),
            name,
            description: input.description.clone(),
            manufacturer: input.manufacturer.clone(),
            form: input.form,
            strength_mg: input.strength_mg,
            pills_per_box: input.pills_per_box,
            meal_relation: input.meal_relation,
            created_at: Utc::now(),
        };
        self.store.create_medication(&medication)?;

        tracing::info!("Created medication {} ({})", medication.name, medication.id);
        Ok(medication)
    }

    /// Apply a partial update; absent patch fields are left untouched
    ///
    /// `pills_per_box` is not patchable: stock figures of existing
    /// enrollments are derived from it.
    pub fn update_medication(&self, id: Uuid, patch: &MedicationPatch) -> Result<Medication> {
        validate_medication_patch(patch)?;

        let mut medication = self.get_medication(id)?;

        let patch = MedicationPatch {
            name: patch.name.as_ref().map(|n| n.trim().to_string()),
            ..patch.clone()
        };

        if let Some(ref name) = patch.name {
            if let Some(existing) = self.store.get_medication_by_name(name)? {
                if existing.id != id {
                    return Err(Error::DuplicateName(name.clone()));
                }
            }
        }

        patch.apply(&mut medication);
        self.store.update_medication(&medication)?;

        tracing::info!("Updated medication {}", id);
        Ok(medication)
    }

    pub fn get_medication(&self, id: Uuid) -> Result<Medication> {
        self.store
            .get_medication(id)?
            .ok_or_else(|| Error::not_found("Medication", id))
    }

    pub fn find_medication_by_name(&self, name: &str) -> Result<Medication> {
        self.store
            .get_medication_by_name(name.trim())?
            .ok_or_else(|| Error::not_found("Medication", name.trim()))
    }

    /// One page of medications ordered by name
    pub fn list_medications(&self, limit: usize, offset: usize) -> Result<Vec<Medication>> {
        self.store.list_medications(limit, offset)
    }
}
