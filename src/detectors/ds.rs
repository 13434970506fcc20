//! Data-science workflow checks on Python-looking code: data loaded but never
//! looked at, missing null handling, randomness without a seed.

use std::sync::LazyLock;

use regex::Regex;

use super::{Finding, Report};
use crate::patterns::{compile, compile_ci};

pub const TITLE: &str = "DATA SCIENCE CHECKS: show the data before trusting it";

/// Whether `content` is worth checking at all.
pub fn looks_like_python_data_code(content: &str, file_path: Option<&str>) -> bool {
    let lower = content.to_lowercase();
    lower.contains("python")
        || lower.contains("random")
        || ["pd.", "pandas", "DataFrame", "np.", "numpy", "sklearn", "torch"]
            .iter()
            .any(|needle| content.contains(needle))
        || file_path.is_some_and(|p| {
            std::path::Path::new(p)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("py") || ext.eq_ignore_ascii_case("ipynb"))
        })
}

static FRAME_CREATED: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"pd\.read_(?:csv|excel|json|parquet|sql|table)|pd\.DataFrame\s*\(|\.merge\s*\(|\.concat\s*\(")
});
static INSPECTED: LazyLock<Regex> = LazyLock::new(|| {
    compile(r"\.head\s*\(|\.tail\s*\(|\.info\s*\(|\.shape|\.dtypes|\.columns|display\s*\(|\.describe\s*\(")
});
static NULL_CHECKED: LazyLock<Regex> = LazyLock::new(|| {
    compile_ci(r"\.isnull\s*\(|\.isna\s*\(|\.notna\s*\(|\.notnull\s*\(|\.dropna\s*\(|\.fillna\s*\(|missing")
});

static SEEDED: LazyLock<Regex> = LazyLock::new(|| {
    compile_ci(
        r"np\.random\.seed\s*\(|random\.seed\s*\(|torch\.manual_seed\s*\(|tf\.random\.set_seed\s*\(|set_random_seed\s*\(|SEED\s*=|seed\s*=\s*\d+|random_state\s*=|default_rng\s*\(\s*\d",
    )
});
static RANDOM_CALL: LazyLock<Regex> =
    LazyLock::new(|| compile(r"(?:np\.random|random|torch)\.(\w+)\s*\("));
static MODEL: LazyLock<Regex> = LazyLock::new(|| {
    compile(
        r"(?:RandomForest\w*|GradientBoosting\w*|XGB\w*|train_test_split|KFold|StratifiedKFold|KMeans|IsolationForest)\s*\(",
    )
});
static RANDOM_STATE: LazyLock<Regex> = LazyLock::new(|| compile(r"random_state\s*="));

/// Calls that draw random numbers, as opposed to seeding the generator.
fn draws_randomness(content: &str) -> bool {
    RANDOM_CALL.captures_iter(content).any(|caps| {
        let name = &caps[1];
        !name.contains("seed") && (name.starts_with("rand") || RANDOM_FUNCTIONS.contains(&name))
    })
}

const RANDOM_FUNCTIONS: &[&str] = &[
    "choice",
    "shuffle",
    "permutation",
    "normal",
    "uniform",
    "sample",
    "binomial",
    "poisson",
];

pub fn check(content: &str) -> Vec<Finding> {
    let mut findings = Vec::new();

    if FRAME_CREATED.is_match(content) {
        if !INSPECTED.is_match(content) {
            findings.push(Finding::new(
                "DataFrame created without inspection",
                "add .head(), .info() or .shape",
            ));
        }
        if !NULL_CHECKED.is_match(content) {
            findings.push(Finding::new(
                "No null value check",
                "use df.isnull().sum()",
            ));
        }
    }

    let seeded = SEEDED.is_match(content);
    if draws_randomness(content) && !seeded {
        findings.push(Finding::new(
            "Random operations without seed",
            "set np.random.seed() or pass a seeded generator",
        ));
    }
    if MODEL.is_match(content) && !RANDOM_STATE.is_match(content) {
        findings.push(Finding::new(
            "ML model without random_state",
            "pass random_state=SEED",
        ));
    }
    findings
}

/// Checks for a shell command or written file.
pub fn check_content(content: &str, file_path: Option<&str>) -> Vec<Report> {
    if !looks_like_python_data_code(content, file_path) {
        return Vec::new();
    }
    Report::new(TITLE, check(content)).into_iter().collect()
}
