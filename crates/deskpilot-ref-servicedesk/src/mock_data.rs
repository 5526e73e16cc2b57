//! Simulated HR/IT knowledge for the service-desk reference deployment.
//!
//! All data in this module is hardcoded and fictional. It stands in for the
//! indexed handbook, wiki, and SOP content of a real deployment.

use chrono::{DateTime, TimeZone, Utc};

use deskpilot_contracts::knowledge::{
    KnowledgeSource, PolicyCategory, PolicyDocument, PolicySection, SourceKind,
};

fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0)
        .single()
        .unwrap_or_default()
}

fn section(id: &str, title: &str, content: &str) -> PolicySection {
    PolicySection {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        subsections: vec![],
    }
}

fn tags(list: &[&str]) -> Vec<String> {
    list.iter().map(|t| t.to_string()).collect()
}

// ── Knowledge sources ─────────────────────────────────────────────────────────

pub fn knowledge_sources() -> Vec<KnowledgeSource> {
    let source = |id: &str, name: &str, kind, url: &str, indexed, count| KnowledgeSource {
        id: id.to_string(),
        name: name.to_string(),
        kind,
        url: url.to_string(),
        last_indexed: indexed,
        document_count: count,
        allowlisted: true,
    };

    vec![
        source("ks-001", "Employee Handbook", SourceKind::Handbook, "https://intranet.company.com/handbook", date(2024, 12, 15), 45),
        source("ks-002", "IT Knowledge Base (SharePoint)", SourceKind::Sharepoint, "https://company.sharepoint.com/it-kb", date(2024, 12, 18), 128),
        source("ks-003", "HR Policies (Confluence)", SourceKind::Confluence, "https://company.atlassian.net/hr", date(2024, 12, 10), 67),
        source("ks-004", "Security SOPs", SourceKind::Sop, "https://intranet.company.com/security/sops", date(2024, 12, 12), 34),
        source("ks-005", "IT Service Desk FAQ", SourceKind::Faq, "https://support.company.com/faq", date(2024, 12, 20), 89),
    ]
}

// ── Policy documents ──────────────────────────────────────────────────────────

/// The approved policy corpus, in index order.
pub fn policies() -> Vec<PolicyDocument> {
    vec![
        PolicyDocument {
            id: "pol-001".to_string(),
            title: "Remote Work and VPN Access Policy".to_string(),
            category: PolicyCategory::It,
            version: "2.1".to_string(),
            last_updated: date(2024, 11, 15),
            approved_by: "IT Security Committee".to_string(),
            content: "This policy outlines the requirements for remote work access and VPN usage.".to_string(),
            sections: vec![
                section(
                    "sec-001",
                    "VPN Access Requirements",
                    "All employees working remotely must connect via the company VPN. VPN credentials are issued through the IT service portal. Two-factor authentication is mandatory for all VPN connections.",
                ),
                section(
                    "sec-002",
                    "Approved Devices",
                    "Only company-issued laptops or approved BYOD devices enrolled in MDM are permitted for remote access. Personal devices must be registered and approved by IT Security before VPN access is granted.",
                ),
                section(
                    "sec-003",
                    "Data Security",
                    "Company data must not be stored on local drives. All work files must be saved to approved cloud storage (OneDrive, SharePoint). USB drives are prohibited for company data transfer.",
                ),
            ],
            tags: tags(&["remote work", "vpn", "security", "access"]),
            allowlisted: true,
            source_id: "ks-002".to_string(),
        },
        PolicyDocument {
            id: "pol-002".to_string(),
            title: "Password and Account Security Policy".to_string(),
            category: PolicyCategory::Security,
            version: "3.0".to_string(),
            last_updated: date(2024, 12, 1),
            approved_by: "Chief Information Security Officer".to_string(),
            content: "This policy defines password requirements and account security standards.".to_string(),
            sections: vec![
                section(
                    "sec-004",
                    "Password Requirements",
                    "Passwords must be at least 12 characters long and include uppercase, lowercase, numbers, and special characters. Passwords expire every 90 days. Password reuse from the last 12 passwords is prohibited.",
                ),
                section(
                    "sec-005",
                    "Password Reset Process",
                    "Employees can reset passwords through the self-service portal using their registered mobile device for verification. IT service desk can reset passwords after identity verification via manager approval or security questions.",
                ),
                section(
                    "sec-006",
                    "Multi-Factor Authentication",
                    "MFA is required for all corporate accounts. Approved MFA methods include Microsoft Authenticator, hardware tokens, or SMS to registered mobile numbers.",
                ),
            ],
            tags: tags(&["password", "security", "mfa", "authentication"]),
            allowlisted: true,
            source_id: "ks-004".to_string(),
        },
        PolicyDocument {
            id: "pol-003".to_string(),
            title: "Travel and Expense Reimbursement Policy".to_string(),
            category: PolicyCategory::Travel,
            version: "1.5".to_string(),
            last_updated: date(2024, 10, 20),
            approved_by: "CFO".to_string(),
            content: "This policy governs business travel booking and expense reimbursement.".to_string(),
            sections: vec![
                section(
                    "sec-007",
                    "Travel Booking",
                    "All business travel must be booked through the approved corporate travel portal. Flights should be economy class for domestic and business class for international flights over 6 hours. Hotel bookings must be within the approved per-diem rates.",
                ),
                section(
                    "sec-008",
                    "Expense Submission",
                    "Expenses must be submitted within 30 days of travel completion. All receipts must be attached. Meals are reimbursed up to $75/day domestic, $100/day international. Alcohol is not reimbursable.",
                ),
            ],
            tags: tags(&["travel", "expenses", "reimbursement"]),
            allowlisted: true,
            source_id: "ks-001".to_string(),
        },
        PolicyDocument {
            id: "pol-004".to_string(),
            title: "Employee Benefits and Time Off Policy".to_string(),
            category: PolicyCategory::Benefits,
            version: "2.3".to_string(),
            last_updated: date(2024, 9, 15),
            approved_by: "Head of HR".to_string(),
            content: "This policy outlines employee benefits, vacation, and leave entitlements.".to_string(),
            sections: vec![
                section(
                    "sec-009",
                    "Paid Time Off (PTO)",
                    "Employees accrue 15 days of PTO annually in their first year, increasing to 20 days after 3 years. PTO requests must be submitted at least 2 weeks in advance for approval. Unused PTO rolls over up to 5 days annually.",
                ),
                section(
                    "sec-010",
                    "Health Insurance",
                    "Company provides comprehensive health insurance with employee coverage at no cost. Dependent coverage is available at subsidized rates. Open enrollment occurs annually in November.",
                ),
                section(
                    "sec-011",
                    "Sick Leave",
                    "Employees receive 10 days of sick leave annually, non-rollover. Medical documentation required for absences exceeding 3 consecutive days.",
                ),
            ],
            tags: tags(&["benefits", "pto", "health", "leave"]),
            allowlisted: true,
            source_id: "ks-003".to_string(),
        },
        PolicyDocument {
            id: "pol-005".to_string(),
            title: "Software and Application Access Policy".to_string(),
            category: PolicyCategory::It,
            version: "1.8".to_string(),
            last_updated: date(2024, 12, 10),
            approved_by: "IT Director".to_string(),
            content: "This policy governs software installation and application access requests.".to_string(),
            sections: vec![
                section(
                    "sec-012",
                    "Software Installation",
                    "Only IT-approved software may be installed on company devices. Submit requests through the IT portal. Standard software (Office 365, browsers, PDF readers) is pre-approved. Specialized software requires manager approval.",
                ),
                section(
                    "sec-013",
                    "Cloud Application Access",
                    "Access to SaaS applications (Salesforce, Jira, etc.) requires manager approval. Access is granted based on role and follows least-privilege principle. Annual access reviews are conducted.",
                ),
            ],
            tags: tags(&["software", "access", "applications", "approval"]),
            allowlisted: true,
            source_id: "ks-002".to_string(),
        },
    ]
}

/// A payroll runbook that was indexed with a worked example still holding a
/// real-looking SSN. Used to exercise the output checkpoint.
pub fn misfiled_payroll_runbook() -> PolicyDocument {
    PolicyDocument {
        id: "pol-900".to_string(),
        title: "Payroll Administration Runbook".to_string(),
        category: PolicyCategory::Hr,
        version: "0.9".to_string(),
        last_updated: date(2024, 8, 2),
        approved_by: "Payroll Operations".to_string(),
        content: "Internal steps for processing payroll changes.".to_string(),
        sections: vec![section(
            "sec-900",
            "Direct Deposit Changes",
            "Direct deposit changes are processed in the next payroll cycle. Worked example: employee Jordan Lee, SSN 123-45-6789, routing number on file.",
        )],
        tags: tags(&["payroll", "direct deposit", "hr"]),
        allowlisted: true,
        source_id: "ks-003".to_string(),
    }
}

/// The approved corpus with the misfiled runbook indexed ahead of it.
pub fn policies_with_misfiled_runbook() -> Vec<PolicyDocument> {
    let mut docs = vec![misfiled_payroll_runbook()];
    docs.extend(policies());
    docs
}
