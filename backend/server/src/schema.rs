//! # Resource Schemas
//!
//! Every content type on the site is a flat table of string-or-null columns keyed by an integer id.
//! The column set of each table is fixed here and shared by validation, the store backends and the
//! CSV importer.
//!
//! ## Tables
//! - courses: name, description, category
//! - testimonials: studentName, course, feedback
//! - demo_videos: title, youtubeLink
//! - study_materials: title, description, fileUrl, category
//! - student_inquiries: lead_type, name, email, phone, course, message, created_at
//! - recorded_videos: chapterName, youtubeLink, category
//! - live_classes: topic, description, date, time, meetingLink
//!
//! Inquiries are listed newest first, everything else by ascending id.
use std::{cmp::Ordering, collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

pub const ID: &str = "id";
pub const CREATED_AT: &str = "created_at";

/// Column name to value. `None` is SQL null.
pub type Fields = BTreeMap<String, Option<String>>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: u64,
    #[serde(flatten)]
    pub fields: Fields,
}

impl Record {
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(|value| value.as_deref())
    }
}

/// One row headed for an upsert. Rows without an id are inserted as new.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub id: Option<u64>,
    pub fields: Fields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    /// Filled with the current time by the store when left empty.
    CreatedAt,
}

#[derive(Debug)]
pub struct FieldDef {
    pub name: &'static str,
    pub label: &'static str,
    pub required: bool,
    pub kind: FieldKind,
    /// Alternate CSV header names, tried in order after `name`.
    pub aliases: &'static [&'static str],
}

const fn required(name: &'static str, label: &'static str, kind: FieldKind) -> FieldDef {
    FieldDef {
        name,
        label,
        required: true,
        kind,
        aliases: &[],
    }
}

const fn optional(name: &'static str, label: &'static str, kind: FieldKind) -> FieldDef {
    FieldDef {
        name,
        label,
        required: false,
        kind,
        aliases: &[],
    }
}

const fn aliased(field: FieldDef, aliases: &'static [&'static str]) -> FieldDef {
    FieldDef { aliases, ..field }
}

const COURSE: &[FieldDef] = &[
    required("name", "Name", FieldKind::Text),
    required("description", "Description", FieldKind::Text),
    required("category", "Category", FieldKind::Text),
];

const TESTIMONIAL: &[FieldDef] = &[
    aliased(
        required("studentName", "Student name", FieldKind::Text),
        &["student_name", "name"],
    ),
    required("course", "Course", FieldKind::Text),
    required("feedback", "Feedback", FieldKind::Text),
];

const DEMO_VIDEO: &[FieldDef] = &[
    required("title", "Title", FieldKind::Text),
    aliased(
        required("youtubeLink", "YouTube link", FieldKind::Text),
        &["youtube_link", "url"],
    ),
];

const STUDY_MATERIAL: &[FieldDef] = &[
    required("title", "Title", FieldKind::Text),
    required("description", "Description", FieldKind::Text),
    aliased(
        required("fileUrl", "File URL", FieldKind::Text),
        &["file_url", "url"],
    ),
    required("category", "Category", FieldKind::Text),
];

const INQUIRY: &[FieldDef] = &[
    optional("lead_type", "Lead type", FieldKind::Text),
    required("name", "Name", FieldKind::Text),
    required("email", "Email", FieldKind::Text),
    optional("phone", "Phone", FieldKind::Text),
    optional("course", "Course", FieldKind::Text),
    optional("message", "Message", FieldKind::Text),
    optional(CREATED_AT, "Created at", FieldKind::CreatedAt),
];

const RECORDED_VIDEO: &[FieldDef] = &[
    aliased(
        required("chapterName", "Chapter name", FieldKind::Text),
        &["chapter", "name"],
    ),
    aliased(
        required("youtubeLink", "YouTube link", FieldKind::Text),
        &["youtube_link", "url"],
    ),
    optional("category", "Category", FieldKind::Text),
];

const LIVE_CLASS: &[FieldDef] = &[
    required("topic", "Topic", FieldKind::Text),
    optional("description", "Description", FieldKind::Text),
    required("date", "Date", FieldKind::Text),
    required("time", "Time", FieldKind::Text),
    aliased(
        optional("meetingLink", "Meeting link", FieldKind::Text),
        &["meeting_link"],
    ),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Course,
    Testimonial,
    DemoVideo,
    StudyMaterial,
    Inquiry,
    RecordedVideo,
    LiveClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListOrder {
    IdAscending,
    NewestFirst,
}

impl Resource {
    pub const ALL: [Resource; 7] = [
        Resource::Course,
        Resource::Testimonial,
        Resource::DemoVideo,
        Resource::StudyMaterial,
        Resource::Inquiry,
        Resource::RecordedVideo,
        Resource::LiveClass,
    ];

    pub fn table(self) -> &'static str {
        match self {
            Resource::Course => "courses",
            Resource::Testimonial => "testimonials",
            Resource::DemoVideo => "demo_videos",
            Resource::StudyMaterial => "study_materials",
            Resource::Inquiry => "student_inquiries",
            Resource::RecordedVideo => "recorded_videos",
            Resource::LiveClass => "live_classes",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Resource::Course => "courses",
            Resource::Testimonial => "testimonials",
            Resource::DemoVideo => "demo-videos",
            Resource::StudyMaterial => "study-materials",
            Resource::Inquiry => "inquiries",
            Resource::RecordedVideo => "recorded-videos",
            Resource::LiveClass => "live-classes",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Resource::Course => "Courses",
            Resource::Testimonial => "Testimonials",
            Resource::DemoVideo => "Demo Videos",
            Resource::StudyMaterial => "Study Materials",
            Resource::Inquiry => "Student Inquiries",
            Resource::RecordedVideo => "Recorded Videos",
            Resource::LiveClass => "Live Classes",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|resource| resource.slug() == slug)
    }

    pub fn fields(self) -> &'static [FieldDef] {
        match self {
            Resource::Course => COURSE,
            Resource::Testimonial => TESTIMONIAL,
            Resource::DemoVideo => DEMO_VIDEO,
            Resource::StudyMaterial => STUDY_MATERIAL,
            Resource::Inquiry => INQUIRY,
            Resource::RecordedVideo => RECORDED_VIDEO,
            Resource::LiveClass => LIVE_CLASS,
        }
    }

    pub fn field(self, name: &str) -> Option<&'static FieldDef> {
        self.fields().iter().find(|field| field.name == name)
    }

    pub fn order(self) -> ListOrder {
        match self {
            Resource::Inquiry => ListOrder::NewestFirst,
            _ => ListOrder::IdAscending,
        }
    }

    /// Inquiries are leads and never served on public pages.
    pub fn is_public(self) -> bool {
        self != Resource::Inquiry
    }

    pub fn has_video(self) -> bool {
        matches!(self, Resource::DemoVideo | Resource::RecordedVideo)
    }

    /// Blank form state: every column present as an empty string.
    pub fn blank_form(self) -> Fields {
        self.fields()
            .iter()
            .filter(|field| field.kind != FieldKind::CreatedAt)
            .map(|field| (field.name.to_string(), Some(String::new())))
            .collect()
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

impl ListOrder {
    /// `created_at` is stored as fixed-width UTC by the table rules, so comparing the text
    /// compares the instants.
    pub fn compare(self, a: &Record, b: &Record) -> Ordering {
        match self {
            ListOrder::IdAscending => a.id.cmp(&b.id),
            ListOrder::NewestFirst => b
                .get(CREATED_AT)
                .cmp(&a.get(CREATED_AT))
                .then(b.id.cmp(&a.id)),
        }
    }

    pub fn sort(self, records: &mut [Record]) {
        records.sort_by(|a, b| self.compare(a, b));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, created_at: Option<&str>) -> Record {
        let mut fields = Fields::new();
        fields.insert(CREATED_AT.to_string(), created_at.map(str::to_string));
        Record { id, fields }
    }

    #[test]
    fn test_slugs_round_trip() {
        for resource in Resource::ALL {
            assert_eq!(Resource::from_slug(resource.slug()), Some(resource));
        }
        assert_eq!(Resource::from_slug("login"), None);
    }

    #[test]
    fn test_newest_first() {
        let mut records = vec![
            record(1, Some("2025-01-01T00:00:00Z")),
            record(2, None),
            record(3, Some("2025-03-01T00:00:00Z")),
        ];
        ListOrder::NewestFirst.sort(&mut records);

        let ids: Vec<u64> = records.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn test_record_json_is_flat() {
        let mut fields = Fields::new();
        fields.insert("name".into(), Some("NEET".into()));
        fields.insert("phone".into(), None);
        let json = serde_json::to_value(Record { id: 4, fields }).unwrap();

        assert_eq!(
            json,
            serde_json::json!({ "id": 4, "name": "NEET", "phone": null })
        );
    }

    #[test]
    fn test_labels() {
        assert_eq!(Resource::LiveClass.label(), "Live Classes");
        assert_eq!(Resource::Inquiry.label(), "Student Inquiries");
    }

    #[test]
    fn test_blank_form_skips_timestamps() {
        let form = Resource::Inquiry.blank_form();
        assert!(!form.contains_key(CREATED_AT));
        assert_eq!(form.get("email"), Some(&Some(String::new())));
    }
}
