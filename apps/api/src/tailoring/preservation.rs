//! Content preservation for tailored resumes.
//!
//! The base facts are the source of truth: every base role and education row must
//! exist in the output, base bullets are merged back when the model dropped them,
//! and role headers, contact, education and certifications are reset to the base.

use std::collections::HashSet;

use tracing::{error, warn};

use crate::errors::AppError;
use crate::models::{CandidateFacts, EducationEntry, ExperienceEntry, ResumeDoc};
use crate::text::similarity::{bullets_near_duplicate, text_jaccard};

fn lower(v: Option<&str>) -> String {
    v.unwrap_or("").trim().to_lowercase()
}

/// company|title|start|end, lowercased.
pub fn strict_key(e: &ExperienceEntry) -> String {
    [&e.company, &e.title, &e.start, &e.end]
        .iter()
        .map(|v| lower(v.as_deref()))
        .collect::<Vec<_>>()
        .join("|")
}

/// company|title, lowercased. Date formats often differ between base and output.
pub fn header_key(e: &ExperienceEntry) -> String {
    format!("{}|{}", lower(e.company.as_deref()), lower(e.title.as_deref()))
}

fn education_key(e: &EducationEntry) -> String {
    [&e.school, &e.degree, &e.field, &e.year]
        .iter()
        .map(|v| lower(v.as_deref()))
        .collect::<Vec<_>>()
        .join("|")
}

/// Token Jaccard on both company and title reaches `threshold`.
pub fn roles_probably_same(a: &ExperienceEntry, b: &ExperienceEntry, threshold: f64) -> bool {
    text_jaccard(a.company.as_deref().unwrap_or(""), b.company.as_deref().unwrap_or("")) >= threshold
        && text_jaccard(a.title.as_deref().unwrap_or(""), b.title.as_deref().unwrap_or("")) >= threshold
}

pub fn role_matches(out: &ExperienceEntry, base: &ExperienceEntry, threshold: f64) -> bool {
    roles_probably_same(out, base, threshold)
        || strict_key(out) == strict_key(base)
        || header_key(out) == header_key(base)
}

/// Appends every base role that has no match in `out`. Roles with an empty key are skipped.
pub fn ensure_all_roles(
    base: &[ExperienceEntry],
    mut out: Vec<ExperienceEntry>,
    threshold: f64,
) -> Vec<ExperienceEntry> {
    for b in base {
        if strict_key(b) == "|||" {
            continue;
        }
        if !out.iter().any(|o| role_matches(o, b, threshold)) {
            out.push(b.clone());
        }
    }
    out
}

pub fn ensure_all_education(base: &[EducationEntry], mut out: Vec<EducationEntry>) -> Vec<EducationEntry> {
    let mut seen: HashSet<String> = out.iter().map(education_key).collect();
    for b in base {
        let key = education_key(b);
        if key == "|||" {
            continue;
        }
        if seen.insert(key) {
            out.push(b.clone());
        }
    }
    out
}

/// Appends each base bullet to the matching output role unless the role already has
/// a near-duplicate of it. Roles are matched by strict key, then by header key.
pub fn merge_bullets_from_base(
    base: &[ExperienceEntry],
    mut out: Vec<ExperienceEntry>,
    bullet_threshold: f64,
) -> Vec<ExperienceEntry> {
    for o in out.iter_mut() {
        let (strict, header) = (strict_key(o), header_key(o));
        let Some(b) = base
            .iter()
            .find(|b| strict_key(b) == strict)
            .or_else(|| base.iter().find(|b| header_key(b) == header))
        else {
            continue;
        };
        for bullet in &b.bullets {
            let bullet = bullet.trim();
            if bullet.is_empty()
                || o.bullets.iter().any(|x| bullets_near_duplicate(x, bullet, bullet_threshold))
            {
                continue;
            }
            o.bullets.push(bullet.to_string());
        }
    }
    out
}

fn missing_roles<'a>(
    base: &'a [ExperienceEntry],
    out: &[ExperienceEntry],
    threshold: f64,
) -> Vec<&'a ExperienceEntry> {
    base.iter()
        .filter(|b| !out.iter().any(|o| role_matches(o, b, threshold)))
        .collect()
}

/// Ensures roles, education and bullets survive, then re-verifies. A role still
/// missing after the merge fails the request.
pub fn enforce_preservation(
    doc: &mut ResumeDoc,
    facts: &CandidateFacts,
    role_threshold: f64,
    bullet_threshold: f64,
) -> Result<(), AppError> {
    let base = &facts.experience;
    let experience = ensure_all_roles(base, std::mem::take(&mut doc.experience), role_threshold);
    doc.experience = merge_bullets_from_base(base, experience, bullet_threshold);
    doc.education = ensure_all_education(&facts.education, std::mem::take(&mut doc.education));

    let missing: Vec<ExperienceEntry> = missing_roles(base, &doc.experience, role_threshold)
        .into_iter()
        .cloned()
        .collect();
    if !missing.is_empty() {
        warn!("{} base roles unmatched after merge; appending verbatim", missing.len());
        doc.experience.extend(missing);
    }

    let still_missing = missing_roles(base, &doc.experience, role_threshold);
    if still_missing.is_empty() {
        return Ok(());
    }
    let names = still_missing
        .iter()
        .take(8)
        .map(|e| e.label())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("; ");
    error!("Preservation check failed: {}", names);
    Err(AppError::PreservationCheckFailed(format!(
        "missing base experience roles: {names}"
    )))
}

/// Pairs each base role with at most one output role, and each output role with at
/// most one base role. Exact strict keys are claimed first, then header keys, then
/// the Jaccard rule, so a promotion at the same company cannot take its sibling's
/// output.
pub fn assign_output_roles(
    base: &[ExperienceEntry],
    out: &[ExperienceEntry],
    threshold: f64,
) -> Vec<Option<usize>> {
    let mut assigned: Vec<Option<usize>> = vec![None; base.len()];
    let mut used = vec![false; out.len()];
    let matches = |pass: usize, o: &ExperienceEntry, b: &ExperienceEntry| match pass {
        0 => strict_key(o) == strict_key(b),
        1 => header_key(o) == header_key(b),
        _ => roles_probably_same(o, b, threshold),
    };

    for pass in 0..3 {
        for (bi, b) in base.iter().enumerate() {
            if assigned[bi].is_some() {
                continue;
            }
            if let Some(oi) = (0..out.len()).find(|&oi| !used[oi] && matches(pass, &out[oi], b)) {
                used[oi] = true;
                assigned[bi] = Some(oi);
            }
        }
    }
    assigned
}

/// Resets everything the model may not edit. The output keeps one role per base
/// role, in base order: matched output bullets first, then every base bullet that
/// is not a near-duplicate of one already kept.
pub fn enforce_immutable(
    doc: &mut ResumeDoc,
    facts: &CandidateFacts,
    role_threshold: f64,
    bullet_threshold: f64,
) {
    doc.contact = facts.contact.clone();
    doc.education = facts.education.clone();
    doc.certifications = facts.certifications.clone();

    let assigned = assign_output_roles(&facts.experience, &doc.experience, role_threshold);
    let experience = facts
        .experience
        .iter()
        .zip(assigned)
        .map(|(b, matched)| {
            let mut bullets: Vec<String> = matched
                .map(|oi| {
                    doc.experience[oi]
                        .bullets
                        .iter()
                        .map(|x| x.trim().to_string())
                        .filter(|x| !x.is_empty())
                        .collect()
                })
                .unwrap_or_default();
            for bb in b.bullets.iter().map(|x| x.trim()).filter(|x| !x.is_empty()) {
                if !bullets.iter().any(|x| bullets_near_duplicate(x, bb, bullet_threshold)) {
                    bullets.push(bb.to_string());
                }
            }
            ExperienceEntry {
                company: b.company.clone(),
                title: b.title.clone(),
                start: b.start.clone(),
                end: b.end.clone(),
                location: b.location.clone(),
                bullets,
            }
        })
        .collect();
    doc.experience = experience;
}
