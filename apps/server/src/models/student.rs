use super::{blank_as_none, Pagination, Parent, ParentDetails};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

text_enum!(Gender {
    Male => "MALE",
    Female => "FEMALE",
});

text_enum!(BloodType {
    A => "A",
    B => "B",
    AB => "AB",
    O => "O",
    Unknown => "UNKNOWN",
});

text_enum!(Religion {
    Islam => "ISLAM",
    Christian => "CHRISTIAN",
    Catholic => "CATHOLIC",
    Hindu => "HINDU",
    Buddha => "BUDDHA",
    Konghucu => "KONGHUCU",
    Other => "OTHER",
});

text_enum!(
    /// `keadaan_ortu`: whether the student's parents are living.
    ParentStatus {
        Lengkap => "LENGKAP",
        Yatim => "YATIM",
        Piatu => "PIATU",
        YatimPiatu => "YATIM_PIATU",
    }
);

text_enum!(
    /// `status_keluarga`
    FamilyStatus {
        AnakKandung => "ANAK_KANDUNG",
        AnakTiri => "ANAK_TIRI",
        AnakAngkat => "ANAK_ANGKAT",
    }
);

text_enum!(
    /// `tinggal_bersama`: who the student lives with.
    LivingWith {
        OrangTua => "ORANG_TUA",
        KakekNenek => "KAKEK_NENEK",
        PamanBibi => "PAMAN_BIBI",
        SaudaraKandung => "SAUDARA_KANDUNG",
        Kerabat => "KERABAT",
        PantiPontren => "PANTI_PONTREN",
        Lainnya => "LAINNYA",
    }
);

/// Optional registration details. Field names double as JSON keys and column names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentProfile {
    pub nisn: Option<String>,
    pub nik: Option<String>,
    pub asal_sekolah: Option<String>,
    pub tempat_lahir: Option<String>,
    pub tanggal_lahir: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub agama: Option<Religion>,
    #[serde(deserialize_with = "blank_as_none")]
    pub keadaan_ortu: Option<ParentStatus>,
    #[serde(deserialize_with = "blank_as_none")]
    pub status_keluarga: Option<FamilyStatus>,
    pub anak_ke: Option<i32>,
    pub dari_bersaudara: Option<i32>,
    #[serde(deserialize_with = "blank_as_none")]
    pub tinggal_bersama: Option<LivingWith>,
    pub tinggal_bersama_lainnya: Option<String>,
    pub kewarganegaraan: Option<String>,
    pub alamat_jalan: Option<String>,
    pub rt: Option<String>,
    pub rw: Option<String>,
    pub desa_kelurahan: Option<String>,
    pub kecamatan: Option<String>,
    pub kabupaten: Option<String>,
    pub provinsi: Option<String>,
    pub kode_pos: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub photo: Option<String>,
    pub kartu_keluarga: Option<String>,
    pub akta_kelahiran: Option<String>,
    pub ijazah_skl: Option<String>,
    #[serde(deserialize_with = "blank_as_none")]
    pub blood_type: Option<BloodType>,
    pub berat_kg: Option<i32>,
    pub tinggi_cm: Option<i32>,
    pub riwayat_penyakit: Option<String>,
}

impl StudentProfile {
    pub fn merge(&mut self, changes: StudentProfile) {
        overlay!(self, changes;
            nisn, nik, asal_sekolah, tempat_lahir, tanggal_lahir,
            agama, keadaan_ortu, status_keluarga, anak_ke, dari_bersaudara,
            tinggal_bersama, tinggal_bersama_lainnya, kewarganegaraan,
            alamat_jalan, rt, rw, desa_kelurahan, kecamatan, kabupaten, provinsi, kode_pos,
            phone, email, photo, kartu_keluarga, akta_kelahiran, ijazah_skl,
            blood_type, berat_kg, tinggi_cm, riwayat_penyakit,
        );
    }

    /// Empty identifiers would collide on the unique indexes; store them as NULL.
    pub fn normalize(&mut self) {
        for id in [&mut self.nisn, &mut self.nik] {
            if id.as_deref().is_some_and(|v| v.trim().is_empty()) {
                *id = None;
            } else if let Some(v) = id {
                *v = v.trim().to_string();
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: i32,
    pub full_name: String,
    pub gender: Gender,
    #[serde(flatten)]
    pub profile: StudentProfile,
    pub is_accepted: bool,
    pub parent_id: Option<i32>,
    pub batch_id: Option<i32>,
    pub parent: Option<Parent>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn to_record(&self) -> StudentRecord {
        StudentRecord {
            full_name: self.full_name.clone(),
            gender: self.gender,
            profile: self.profile.clone(),
            is_accepted: self.is_accepted,
            parent_id: self.parent_id,
            batch_id: self.batch_id,
        }
    }
}

/// Column values the student store writes.
#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    pub full_name: String,
    pub gender: Gender,
    pub profile: StudentProfile,
    pub is_accepted: bool,
    pub parent_id: Option<i32>,
    pub batch_id: Option<i32>,
}

/// Create payload for both the public form and the admin panel.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct NewStudent {
    #[serde(default)]
    #[validate(length(min = 1))]
    pub full_name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(required)]
    pub gender: Option<Gender>,
    #[serde(flatten)]
    pub profile: StudentProfile,
    #[serde(default)]
    pub is_accepted: bool,
    #[serde(default)]
    pub parent_id: Option<i32>,
    #[serde(default)]
    pub batch_id: Option<i32>,
    #[serde(default)]
    pub parent: Option<ParentDetails>,
}

impl NewStudent {
    pub fn normalize(mut self) -> Self {
        self.full_name = self.full_name.trim().to_string();
        self.profile.normalize();
        self
    }

    /// Split into the student columns and the embedded parent.
    ///
    /// Returns `None` when `gender` is missing; callers validate first.
    pub fn into_parts(self) -> Option<(StudentRecord, Option<ParentDetails>)> {
        let record = StudentRecord {
            full_name: self.full_name,
            gender: self.gender?,
            profile: self.profile,
            is_accepted: self.is_accepted,
            parent_id: self.parent_id,
            batch_id: self.batch_id,
        };
        Some((record, self.parent))
    }
}

/// Partial update; an embedded `parent` updates (or creates) the linked parent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentChanges {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub gender: Option<Gender>,
    #[serde(flatten)]
    pub profile: StudentProfile,
    #[serde(default)]
    pub is_accepted: Option<bool>,
    #[serde(default)]
    pub batch_id: Option<i32>,
    #[serde(default)]
    pub parent: Option<ParentDetails>,
}

impl StudentChanges {
    /// Apply to an existing record, returning the embedded parent payload.
    pub fn apply_to(self, record: &mut StudentRecord) -> Option<ParentDetails> {
        if let Some(name) = self.full_name.map(|n| n.trim().to_string()) {
            if !name.is_empty() {
                record.full_name = name;
            }
        }
        if let Some(gender) = self.gender {
            record.gender = gender;
        }
        if let Some(accepted) = self.is_accepted {
            record.is_accepted = accepted;
        }
        if self.batch_id.is_some() {
            record.batch_id = self.batch_id;
        }
        let mut profile = self.profile;
        profile.normalize();
        record.profile.merge(profile);
        self.parent
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StudentFilter {
    pub pagination: Pagination,
    /// Case-insensitive match on full name, NISN or NIK.
    pub search: Option<String>,
    pub batch_id: Option<i32>,
    pub accepted: Option<bool>,
}

impl StudentFilter {
    pub fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn blank_gender_is_missing() {
        let student: NewStudent =
            serde_json::from_value(json!({"full_name": "Siti", "gender": ""})).unwrap();
        assert_eq!(student.gender, None);
        assert!(student.validate().is_err());
    }

    #[test]
    fn profile_fields_flatten_into_payload() {
        let student: NewStudent = serde_json::from_value(json!({
            "full_name": "Budi",
            "gender": "MALE",
            "nisn": "1234567890",
            "agama": "ISLAM",
            "anak_ke": 2,
            "tinggal_bersama": "ORANG_TUA",
            "parent": {"father_name": "Ahmad"}
        }))
        .unwrap();

        assert_eq!(student.profile.nisn.as_deref(), Some("1234567890"));
        assert_eq!(student.profile.agama, Some(Religion::Islam));
        assert_eq!(student.profile.anak_ke, Some(2));
        assert_eq!(student.profile.tinggal_bersama, Some(LivingWith::OrangTua));
        assert_eq!(
            student.parent.and_then(|p| p.father_name).as_deref(),
            Some("Ahmad")
        );
    }

    #[test]
    fn unknown_enum_value_is_rejected() {
        let result: Result<NewStudent, _> =
            serde_json::from_value(json!({"full_name": "X", "gender": "OTHER"}));
        assert!(result.is_err());
    }

    #[test]
    fn changes_merge_only_present_fields() {
        let mut record = StudentRecord {
            full_name: "Budi".into(),
            gender: Gender::Male,
            profile: StudentProfile {
                nisn: Some("1".into()),
                phone: Some("0812".into()),
                ..Default::default()
            },
            is_accepted: false,
            parent_id: None,
            batch_id: Some(3),
        };
        let changes: StudentChanges =
            serde_json::from_value(json!({"phone": "0813", "is_accepted": true})).unwrap();

        assert!(changes.apply_to(&mut record).is_none());
        assert_eq!(record.full_name, "Budi");
        assert_eq!(record.profile.nisn.as_deref(), Some("1"));
        assert_eq!(record.profile.phone.as_deref(), Some("0813"));
        assert!(record.is_accepted);
        assert_eq!(record.batch_id, Some(3));
    }

    #[test]
    fn blank_identifiers_become_null() {
        let mut profile = StudentProfile {
            nisn: Some("  ".into()),
            nik: Some(" 3201 ".into()),
            ..Default::default()
        };
        profile.normalize();
        assert_eq!(profile.nisn, None);
        assert_eq!(profile.nik.as_deref(), Some("3201"));
    }
}
