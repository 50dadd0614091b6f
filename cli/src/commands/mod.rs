mod export;
mod glossary;
mod helpers;
mod report;
mod subjects;

pub(crate) use export::cmd_export;
pub(crate) use glossary::cmd_glossary;
pub(crate) use helpers::Selection;
pub(crate) use report::cmd_report;
pub(crate) use subjects::cmd_subjects;
