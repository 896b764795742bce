//! Static metric catalog and record categories.
//!
//! The catalog is the fixed set of 17 gauge definitions exported for a
//! Corvault array: 10 controller-scoped and 7 disk-scoped, four of which are
//! reported once per redundant controller path. It lives in a `static` so every
//! collector in the process shares the same metric names and help strings.

/// The two record arrays reported by the array CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// One record per storage controller (`show controller-statistics`).
    Controller,
    /// One record per physical drive (`show disk-statistics`).
    Disk,
}

impl Category {
    /// Both categories, in the order a collection cycle fetches them.
    pub const ALL: [Category; 2] = [Category::Controller, Category::Disk];

    /// CLI command that produces this category's JSON payload.
    pub fn command(self) -> &'static str {
        match self {
            Self::Controller => "set cli-parameters json; show controller-statistics",
            Self::Disk => "set cli-parameters json; show disk-statistics",
        }
    }

    /// Top-level key of the record array in the JSON payload.
    pub fn collection_key(self) -> &'static str {
        match self {
            Self::Controller => "controller-statistics",
            Self::Disk => "disk-statistics",
        }
    }

    /// Catalog entries that apply to records of this category, in catalog order.
    pub fn metrics(self) -> impl Iterator<Item = &'static MetricDef> {
        CATALOG.iter().filter(move |m| m.category == self)
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Controller => write!(f, "controller"),
            Self::Disk => write!(f, "disk"),
        }
    }
}

/// Where a metric's value comes from inside one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldSource {
    /// A single field, exported with labels `{host, id}`.
    Single(&'static str),
    /// One field per controller path (`<field>-1`, `<field>-2`), exported with
    /// labels `{host, id, cid}`.
    PerPath([&'static str; 2]),
}

/// One exported gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricDef {
    pub name: &'static str,
    pub help: &'static str,
    pub category: Category,
    pub source: FieldSource,
}

/// Label name for the array host.
pub const LABEL_HOST: &str = "host";
/// Label name for the device `durable-id`.
pub const LABEL_ID: &str = "id";
/// Label name for the controller path index.
pub const LABEL_CID: &str = "cid";

const DEVICE_LABELS: &[&str] = &[LABEL_HOST, LABEL_ID];
const PATH_LABELS: &[&str] = &[LABEL_HOST, LABEL_ID, LABEL_CID];

impl MetricDef {
    /// Label names in exposition order.
    pub fn label_names(&self) -> &'static [&'static str] {
        match self.source {
            FieldSource::Single(_) => DEVICE_LABELS,
            FieldSource::PerPath(_) => PATH_LABELS,
        }
    }

    pub fn is_path_indexed(&self) -> bool {
        matches!(self.source, FieldSource::PerPath(_))
    }

    /// Observations this metric contributes per record.
    pub fn observations_per_record(&self) -> usize {
        match self.source {
            FieldSource::Single(_) => 1,
            FieldSource::PerPath(fields) => fields.len(),
        }
    }
}

const fn controller(name: &'static str, help: &'static str, field: &'static str) -> MetricDef {
    MetricDef {
        name,
        help,
        category: Category::Controller,
        source: FieldSource::Single(field),
    }
}

const fn disk(name: &'static str, help: &'static str, field: &'static str) -> MetricDef {
    MetricDef {
        name,
        help,
        category: Category::Disk,
        source: FieldSource::Single(field),
    }
}

const fn disk_per_path(
    name: &'static str,
    help: &'static str,
    path1: &'static str,
    path2: &'static str,
) -> MetricDef {
    MetricDef {
        name,
        help,
        category: Category::Disk,
        source: FieldSource::PerPath([path1, path2]),
    }
}

/// Every exported metric, in exposition order.
pub static CATALOG: [MetricDef; 17] = [
    controller("seagate_corvault_controller_cpuload", "cpu load", "cpu-load"),
    controller("seagate_corvault_controller_reads", "reads", "number-of-reads"),
    controller("seagate_corvault_controller_writes", "writes", "number-of-writes"),
    controller("seagate_corvault_controller_rca_hits", "read cache hits", "read-cache-hits"),
    controller("seagate_corvault_controller_rca_miss", "read cache miss", "read-cache-misses"),
    controller("seagate_corvault_controller_wca_hits", "write cache hits", "write-cache-hits"),
    controller("seagate_corvault_controller_wca_miss", "write cache miss", "write-cache-misses"),
    controller("seagate_corvault_controller_wca_used", "write cache used", "write-cache-used"),
    controller("seagate_corvault_controller_bps", "bytes per second", "bytes-per-second-numeric"),
    controller("seagate_corvault_controller_iops", "I/O per second", "iops"),
    disk("seagate_corvault_disk_poweron", "power on hours", "power-on-hours"),
    disk("seagate_corvault_disk_reads", "disk reads", "number-of-reads"),
    disk("seagate_corvault_disk_writes", "disk writes", "number-of-writes"),
    disk_per_path(
        "seagate_corvault_disk_io_timeouts",
        "I/O Timeouts",
        "io-timeout-count-1",
        "io-timeout-count-2",
    ),
    disk_per_path(
        "seagate_corvault_disk_media_errors",
        "Media Errors",
        "number-of-media-errors-1",
        "number-of-media-errors-2",
    ),
    disk_per_path(
        "seagate_corvault_disk_bad_blocks",
        "Bad Blocks",
        "number-of-bad-blocks-1",
        "number-of-bad-blocks-2",
    ),
    disk_per_path(
        "seagate_corvault_disk_block_reassigns",
        "Block Reassigns",
        "number-of-block-reassigns-1",
        "number-of-block-reassigns-2",
    ),
];

/// Look up a catalog entry by metric name.
pub fn find(name: &str) -> Option<&'static MetricDef> {
    CATALOG.iter().find(|m| m.name == name)
}

/// Observations produced per record of `category`.
pub fn observations_per_record(category: Category) -> usize {
    category.metrics().map(MetricDef::observations_per_record).sum()
}
