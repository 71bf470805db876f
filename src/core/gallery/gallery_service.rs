use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::cards::DriveFile;

/// Cards shown per gallery page.
pub const GALLERY_PAGE_SIZE: usize = 8;

/// Sheet-derived metadata for one card, keyed by File ID. The display
/// filename is deliberately not a key anywhere: two files may share a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardInfo {
    pub memo: String,
    pub sheet_modified_date: String,
}

/// One gallery entry: a Drive file merged with its sheet metadata.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    #[serde(flatten)]
    pub file: DriveFile,
    pub memo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sheet_modified_date: Option<String>,
}

impl GalleryItem {
    /// Effective last-modified time: the sheet timestamp when present and
    /// parseable, else Drive's modifiedTime, else the epoch.
    pub fn sort_key(&self) -> DateTime<Utc> {
        self.sheet_modified_date
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .or(self.file.modified_time)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

/// Joins a Drive listing with the sheet-derived card map and sorts most
/// recent first. Files without a sheet entry get an empty memo and fall back
/// to their Drive timestamp.
pub fn build_gallery(
    files: Vec<DriveFile>,
    info_by_id: &HashMap<String, CardInfo>,
) -> Vec<GalleryItem> {
    let mut items: Vec<GalleryItem> = files
        .into_iter()
        .map(|file| {
            let info = info_by_id.get(&file.id);
            GalleryItem {
                memo: info.map(|i| i.memo.clone()).unwrap_or_default(),
                sheet_modified_date: info
                    .map(|i| i.sheet_modified_date.clone())
                    .filter(|date| !date.is_empty()),
                file,
            }
        })
        .collect();
    items.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
    items
}

/// Case-insensitive substring filter on the display filename.
pub fn filter_by_name(items: &[GalleryItem], term: &str) -> Vec<GalleryItem> {
    if term.is_empty() {
        return items.to_vec();
    }
    let needle = term.to_lowercase();
    items
        .iter()
        .filter(|item| item.file.name.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryPage {
    pub items: Vec<GalleryItem>,
    pub page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}

/// Fixed-size pagination. The requested page is clamped into range, so a
/// search that shrinks the result set never strands the viewer on an empty
/// page.
pub fn paginate(items: Vec<GalleryItem>, page: usize) -> GalleryPage {
    let total_items = items.len();
    let total_pages = total_items.div_ceil(GALLERY_PAGE_SIZE);
    let page = page.clamp(1, total_pages.max(1));
    let start = (page - 1) * GALLERY_PAGE_SIZE;
    let items: Vec<GalleryItem> = items
        .into_iter()
        .skip(start)
        .take(GALLERY_PAGE_SIZE)
        .collect();
    GalleryPage {
        items,
        page,
        total_pages,
        total_items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn file(id: &str, name: &str, modified: Option<&str>) -> DriveFile {
        DriveFile {
            id: id.to_string(),
            name: name.to_string(),
            mime_type: "image/jpeg".to_string(),
            web_view_link: None,
            modified_time: modified.map(|raw| {
                DateTime::parse_from_rfc3339(raw)
                    .unwrap()
                    .with_timezone(&Utc)
            }),
            thumbnail_link: None,
        }
    }

    fn info(memo: &str, date: &str) -> CardInfo {
        CardInfo {
            memo: memo.to_string(),
            sheet_modified_date: date.to_string(),
        }
    }

    #[test]
    fn join_merges_memo_and_defaults_missing_entries() {
        let files = vec![file("f1", "a.jpg", None), file("f2", "b.jpg", None)];
        let mut map = HashMap::new();
        map.insert("f1".to_string(), info("x", "2024-01-01T00:00:00Z"));

        let gallery = build_gallery(files, &map);
        let a = gallery.iter().find(|i| i.file.name == "a.jpg").unwrap();
        let b = gallery.iter().find(|i| i.file.name == "b.jpg").unwrap();

        assert_eq!(a.memo, "x");
        assert_eq!(a.sheet_modified_date.as_deref(), Some("2024-01-01T00:00:00Z"));
        assert_eq!(b.memo, "");
        assert_eq!(b.sheet_modified_date, None);
        // No timestamp anywhere: b falls back to the epoch sort key.
        assert_eq!(b.sort_key(), DateTime::<Utc>::UNIX_EPOCH);
    }

    #[test]
    fn sort_is_most_recent_first_with_drive_fallback() {
        let files = vec![
            file("f1", "old.jpg", Some("2024-01-01T00:00:00Z")),
            file("f2", "new.jpg", Some("2024-06-01T00:00:00Z")),
            file("f3", "sheet.jpg", Some("2024-02-01T00:00:00Z")),
        ];
        let mut map = HashMap::new();
        // Sheet timestamp beats the (older) Drive timestamp for f3.
        map.insert("f3".to_string(), info("", "2024-07-01T00:00:00Z"));

        let gallery = build_gallery(files, &map);
        let order: Vec<&str> = gallery.iter().map(|i| i.file.name.as_str()).collect();
        assert_eq!(order, vec!["sheet.jpg", "new.jpg", "old.jpg"]);
    }

    #[test]
    fn sort_key_prefers_parseable_sheet_date() {
        let item = GalleryItem {
            file: file("f1", "a.jpg", Some("2024-01-01T00:00:00Z")),
            memo: String::new(),
            sheet_modified_date: Some("not a date".to_string()),
        };
        // Unparseable sheet date falls back to the Drive timestamp.
        assert_eq!(
            item.sort_key(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn filter_is_case_insensitive_substring() {
        let gallery = build_gallery(
            vec![
                file("f1", "Yamada.jpg", None),
                file("f2", "suzuki.png", None),
                file("f3", "yamamoto.jpg", None),
            ],
            &HashMap::new(),
        );

        let hits = filter_by_name(&gallery, "YAMA");
        let names: Vec<&str> = hits.iter().map(|i| i.file.name.as_str()).collect();
        assert_eq!(names.len(), 2);
        assert!(names.contains(&"Yamada.jpg"));
        assert!(names.contains(&"yamamoto.jpg"));

        assert_eq!(filter_by_name(&gallery, "").len(), 3);
    }

    #[test]
    fn pagination_slices_and_clamps() {
        let files: Vec<DriveFile> = (0..20)
            .map(|n| file(&format!("f{}", n), &format!("card{:02}.jpg", n), None))
            .collect();
        let gallery = build_gallery(files, &HashMap::new());

        let first = paginate(gallery.clone(), 1);
        assert_eq!(first.items.len(), GALLERY_PAGE_SIZE);
        assert_eq!(first.total_pages, 3);
        assert_eq!(first.total_items, 20);

        let last = paginate(gallery.clone(), 3);
        assert_eq!(last.items.len(), 4);

        // Out-of-range pages clamp instead of returning nothing.
        assert_eq!(paginate(gallery.clone(), 99).page, 3);
        assert_eq!(paginate(gallery, 0).page, 1);
    }

    #[test]
    fn empty_gallery_paginates_to_a_single_empty_page() {
        let page = paginate(Vec::new(), 1);
        assert!(page.items.is_empty());
        assert_eq!(page.page, 1);
        assert_eq!(page.total_pages, 0);
    }
}
