//! Keyword classifier mapping a request description to an expert team.
//!
//! The taxonomy's declared order is load-bearing: it decides both the order
//! of the selected team and which experts survive the size cap. Selection is
//! a pure function of the description.

/// Expert appended to every team so someone coordinates the request.
pub const COORDINATING_EXPERT: &str = "architecture";

/// Upper bound on team size.
pub const MAX_EXPERTS: usize = 5;

/// Expert names and their trigger keywords, in evaluation order.
pub const EXPERT_TAXONOMY: &[(&str, &[&str])] = &[
    ("frontend", &["ui", "react", "vue", "angular", "web", "interface"]),
    ("backend", &["api", "server", "database", "service", "microservice"]),
    ("devops", &["deploy", "docker", "kubernetes", "ci/cd", "infrastructure"]),
    ("security", &["auth", "security", "encryption", "vulnerability", "compliance"]),
    ("ai_ml", &["ai", "ml", "machine learning", "neural", "model", "training"]),
    ("mobile", &["mobile", "ios", "android", "react native", "flutter"]),
    ("blockchain", &["blockchain", "crypto", "smart contract", "web3", "defi"]),
    ("testing", &["test", "qa", "quality", "automation", "junit"]),
    ("architecture", &["architecture", "design", "pattern", "system"]),
    ("data_science", &["data", "analytics", "visualization", "etl", "pipeline"]),
];

/// Select the expert team for `description`.
///
/// Guarantees: 1..=MAX_EXPERTS entries, always contains the coordinating
/// expert, deterministic for equal input.
pub fn select_experts(description: &str) -> Vec<String> {
    let text = description.to_lowercase();
    let selected: Vec<String> = EXPERT_TAXONOMY
        .iter()
        .filter(|(_, terms)| terms.iter().any(|term| text.contains(term)))
        .map(|(name, _)| name.to_string())
        .collect();
    normalize_team(selected)
}

/// Enforce the team guarantees on an explicit caller-supplied list too:
/// dedupe, append the coordinator, cap the size without ever dropping the
/// coordinator.
pub fn normalize_team(experts: Vec<String>) -> Vec<String> {
    let mut team: Vec<String> = Vec::new();
    for expert in experts {
        if !team.contains(&expert) {
            team.push(expert);
        }
    }
    if !team.iter().any(|e| e == COORDINATING_EXPERT) {
        team.push(COORDINATING_EXPERT.to_string());
    }
    if team.len() > MAX_EXPERTS {
        let coordinator_kept = team[..MAX_EXPERTS].iter().any(|e| e == COORDINATING_EXPERT);
        team.truncate(MAX_EXPERTS);
        if !coordinator_kept {
            // The cap must never squeeze out the coordinator.
            team.pop();
            team.push(COORDINATING_EXPERT.to_string());
        }
    }
    team
}

/// Specialty tags advertised for each expert on the team-status endpoint.
pub fn specialties(expert: &str) -> &'static [&'static str] {
    match expert {
        "frontend" => &["React", "Vue", "Angular", "TypeScript", "CSS", "UX/UI"],
        "backend" => &["Node.js", "Python", "Go", "Rust", "APIs", "Microservices"],
        "devops" => &["Docker", "Kubernetes", "CI/CD", "AWS", "Terraform", "Monitoring"],
        "security" => &["Auth", "Encryption", "OWASP", "Compliance", "Pen Testing"],
        "ai_ml" => &["TensorFlow", "PyTorch", "LLMs", "Computer Vision", "NLP"],
        "mobile" => &["React Native", "Flutter", "iOS", "Android", "Progressive Web Apps"],
        "blockchain" => &["Solidity", "Web3", "DeFi", "Smart Contracts", "Ethereum"],
        "testing" => &["Jest", "Cypress", "Selenium", "Load Testing", "QA Automation"],
        "architecture" => &["System Design", "Patterns", "Scalability", "Performance"],
        "data_science" => &["Data Pipeline", "ETL", "Analytics", "Visualization", "ML Ops"],
        _ => &["General Software Engineering"],
    }
}
