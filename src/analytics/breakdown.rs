//! Categorical breakdowns and page rankings

use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::analytics::compare::round_half_up;
use crate::analytics::models::{
    CategoryCount, PageViewRecord, SessionRecord, TopPage, VisitorRecord,
};

/// Label for page views without a referrer
pub const DIRECT_SOURCE: &str = "Direct";

/// Label for any other missing category value
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Number of entries in the top pages ranking
pub const TOP_PAGES_LIMIT: usize = 10;

/// Categorical dimension a breakdown groups by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Device,
    Browser,
    Country,
    Os,
    Source,
    Path,
}

impl Dimension {
    pub fn fallback_label(self) -> &'static str {
        match self {
            Dimension::Source => DIRECT_SOURCE,
            _ => UNKNOWN_CATEGORY,
        }
    }

    /// Visitor attributes are broken down per unique visitor, the rest per page view
    pub fn is_visitor_attribute(self) -> bool {
        matches!(
            self,
            Dimension::Device | Dimension::Browser | Dimension::Country | Dimension::Os
        )
    }
}

impl FromStr for Dimension {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "device" => Ok(Dimension::Device),
            "browser" => Ok(Dimension::Browser),
            "country" => Ok(Dimension::Country),
            "os" => Ok(Dimension::Os),
            "source" => Ok(Dimension::Source),
            "path" => Ok(Dimension::Path),
            other => Err(format!("unknown dimension '{other}'")),
        }
    }
}

/// Records that expose a value for some of the dimensions
pub trait Categorized {
    fn category(&self, dimension: Dimension) -> Option<&str>;
}

impl<T: Categorized + ?Sized> Categorized for &T {
    fn category(&self, dimension: Dimension) -> Option<&str> {
        (**self).category(dimension)
    }
}

impl Categorized for VisitorRecord {
    fn category(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Device => Some(&self.device),
            Dimension::Browser => Some(&self.browser),
            Dimension::Country => Some(&self.country),
            Dimension::Os => Some(&self.os),
            Dimension::Source | Dimension::Path => None,
        }
    }
}

impl Categorized for SessionRecord {
    fn category(&self, dimension: Dimension) -> Option<&str> {
        self.visitor.category(dimension)
    }
}

impl Categorized for PageViewRecord {
    fn category(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Source => self.referrer.as_deref(),
            Dimension::Path => Some(&self.path),
            _ => None,
        }
    }
}

/// Group records by key and report each group's share of the total.
///
/// Groups are ordered by count, highest first. Equal counts keep the order in
/// which their key was first seen.
pub fn aggregate_by_category<T, F>(records: &[T], key_of: F) -> Vec<CategoryCount>
where
    F: Fn(&T) -> String,
{
    let mut groups: Vec<(String, u64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let key = key_of(record);
        match index.get(&key) {
            Some(&slot) => groups[slot].1 += 1,
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, 1));
            }
        }
    }

    let total = records.len() as u64;
    let mut result: Vec<CategoryCount> = groups
        .into_iter()
        .map(|(key, count)| CategoryCount {
            key,
            count,
            percentage: share_of(count, total),
        })
        .collect();

    // sort_by is stable, so ties stay in first-seen order
    result.sort_by(|a, b| b.count.cmp(&a.count));
    result
}

/// Breakdown of `records` along `dimension`, with missing values under the fallback label
pub fn breakdown<T: Categorized>(records: &[T], dimension: Dimension) -> Vec<CategoryCount> {
    aggregate_by_category(records, |record| {
        record
            .category(dimension)
            .filter(|value| !value.is_empty())
            .unwrap_or(dimension.fallback_label())
            .to_string()
    })
}

/// Distinct visitors of `sessions`, in order of their first session
pub fn unique_visitors(sessions: &[SessionRecord]) -> Vec<&VisitorRecord> {
    let mut seen = HashSet::new();
    sessions
        .iter()
        .filter(|session| seen.insert(session.visitor.id))
        .map(|session| &session.visitor)
        .collect()
}

/// Breakdown of a visitor attribute, counting each visitor once
pub fn visitor_breakdown(sessions: &[SessionRecord], dimension: Dimension) -> Vec<CategoryCount> {
    breakdown(&unique_visitors(sessions), dimension)
}

/// Most viewed paths with their distinct visitor counts
pub fn top_pages(page_views: &[PageViewRecord], limit: usize) -> Vec<TopPage> {
    let mut pages: Vec<(String, u64, HashSet<i64>)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for view in page_views {
        let slot = *index.entry(view.path.as_str()).or_insert_with(|| {
            pages.push((view.path.clone(), 0, HashSet::new()));
            pages.len() - 1
        });
        let (_, views, visitors) = &mut pages[slot];
        *views += 1;
        visitors.insert(view.visitor_id);
    }

    let mut ranked: Vec<TopPage> = pages
        .into_iter()
        .map(|(path, views, visitors)| TopPage {
            path,
            views,
            unique_visitors: visitors.len() as u64,
        })
        .collect();

    ranked.sort_by(|a, b| b.views.cmp(&a.views));
    ranked.truncate(limit);
    ranked
}

/// Percent of `total`, one decimal, scaled by 1000 in a single step so
/// halves such as 23/80 round up
fn share_of(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_half_up(count as f64 / total as f64 * 1000.0) / 10.0
}
