//! Bundled sample documents for trying the hub without a document collection.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::{Domain, DomainError};

struct SampleDocument {
    domain: Domain,
    file_name: &'static str,
    title: &'static str,
    sections: &'static [(&'static str, &'static str)],
}

const SAMPLES: &[SampleDocument] = &[
    SampleDocument {
        domain: Domain::Finance,
        file_name: "gst_basics.md",
        title: "GST: Frequently Asked Questions",
        sections: &[
            (
                "What is GST?",
                "GST (Goods and Services Tax) is an indirect tax levied on the supply of goods and services. \
                 It replaced several cascading indirect taxes with a single destination-based tax. \
                 Intra-state supplies attract CGST and SGST, inter-state supplies attract IGST.",
            ),
            (
                "What is Input Tax Credit?",
                "Input Tax Credit lets a registered business reduce its output tax liability by the GST \
                 already paid on purchases used in the course of business, provided the supplier has \
                 filed the corresponding returns.",
            ),
            (
                "How often are returns filed?",
                "Regular taxpayers file a monthly statement of outward supplies and a monthly summary \
                 return with tax payment. Small taxpayers may opt for quarterly filing.",
            ),
        ],
    },
    SampleDocument {
        domain: Domain::Finance,
        file_name: "income_tax.md",
        title: "Income Tax Notes",
        sections: &[
            (
                "Is salary income fully taxable?",
                "Salary is taxable after allowed exemptions such as the standard deduction. \
                 Employers deduct tax at source (TDS) each month based on the declared regime.",
            ),
            (
                "Can home loan interest be deducted?",
                "Under the old regime, interest on a loan for a self-occupied house can be deducted \
                 up to a yearly cap. The new regime does not allow this deduction for self-occupied property.",
            ),
        ],
    },
    SampleDocument {
        domain: Domain::Medical,
        file_name: "common_conditions.md",
        title: "Common Conditions Reference",
        sections: &[
            (
                "Hypertension",
                "Persistently elevated blood pressure, often without symptoms. Management combines \
                 reduced salt intake, regular exercise, weight control and, when needed, medication \
                 prescribed by a physician.",
            ),
            (
                "Type 2 Diabetes",
                "A metabolic condition with high blood glucose due to insulin resistance. \
                 Diet, activity and glucose monitoring are first-line measures alongside prescribed drugs.",
            ),
            (
                "Migraine",
                "Recurrent headaches, frequently one-sided and throbbing, sometimes with nausea or \
                 light sensitivity. Identifying triggers and timely treatment reduce attack frequency.",
            ),
        ],
    },
    SampleDocument {
        domain: Domain::News,
        file_name: "weekly_digest.md",
        title: "Weekly News Digest",
        sections: &[
            (
                "Sports: Series win for the national cricket team",
                "The national side sealed the series with a game to spare after a composed run chase \
                 led by the middle order.",
            ),
            (
                "Politics: Budget session concludes",
                "Parliament adjourned after passing the finance bill and two infrastructure bills \
                 during the final week of the session.",
            ),
            (
                "Movies: Streaming trailer released",
                "A streaming platform released the first trailer of its upcoming drama series, \
                 scheduled to premiere next month.",
            ),
        ],
    },
];

fn render(sample: &SampleDocument) -> String {
    let mut out = format!("# {}\n\n", sample.title);
    for (heading, body) in sample.sections {
        out.push_str(&format!("## {heading}\n\n{body}\n\n"));
    }
    out
}

/// Writes the bundled documents to `<root>/<domain>/<file>` and returns the paths.
pub fn write_sample_documents(root: &Path) -> Result<Vec<PathBuf>, DomainError> {
    let mut written = Vec::with_capacity(SAMPLES.len());

    for sample in SAMPLES {
        let dir = root.join(sample.domain.as_str());
        std::fs::create_dir_all(&dir).map_err(|err| {
            DomainError::storage(format!("failed to create {}: {err}", dir.display()))
        })?;

        let path = dir.join(sample.file_name);
        std::fs::write(&path, render(sample)).map_err(|err| {
            DomainError::storage(format!("failed to write {}: {err}", path.display()))
        })?;

        info!(target: "intelhub::samples", path = %path.display(), "sample written");
        written.push(path);
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_one_directory_per_domain() {
        let dir = tempfile::tempdir().unwrap();
        let written = write_sample_documents(dir.path()).unwrap();

        assert_eq!(written.len(), SAMPLES.len());
        for domain in Domain::all() {
            assert!(dir.path().join(domain.as_str()).is_dir());
        }

        let gst = std::fs::read_to_string(dir.path().join("finance/gst_basics.md")).unwrap();
        assert!(gst.starts_with("# GST: Frequently Asked Questions"));
        assert!(gst.contains("## What is GST?"));
    }
}
