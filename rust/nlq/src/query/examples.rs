//! Static catalogue of phrasings the parser understands.

use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExampleCategory {
    pub category: &'static str,
    pub queries: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExampleCatalogue {
    pub examples: &'static [ExampleCategory],
    pub tips: &'static [&'static str],
    pub supported_tables: &'static [&'static str],
}

static CATEGORIES: &[ExampleCategory] = &[
    ExampleCategory {
        category: "time_based",
        queries: &[
            "incidents from last week",
            "critical tickets from yesterday",
            "changes from this month",
            "resolved incidents from the last 30 days",
            "week 35 2025 incidents",
            "incidents between August 25, 2025 and September 5, 2025",
        ],
    },
    ExampleCategory {
        category: "priority_based",
        queries: &[
            "high priority incidents",
            "P1 and P2 tickets",
            "critical unassigned incidents",
            "low priority resolved tickets",
        ],
    },
    ExampleCategory {
        category: "state_based",
        queries: &[
            "active incidents",
            "resolved tickets",
            "new unassigned incidents",
            "pending changes",
        ],
    },
    ExampleCategory {
        category: "combined",
        queries: &[
            "high priority incidents from last week",
            "unassigned critical tickets from today",
            "resolved P1 incidents this month",
            "P1 incidents from last week excluding LogicMonitor",
        ],
    },
];

static CATALOGUE: ExampleCatalogue = ExampleCatalogue {
    examples: CATEGORIES,
    tips: &[
        "Be specific about time periods (last week, yesterday, this month)",
        "Include priority levels (P1, P2, critical, high, low)",
        "Mention states (active, resolved, new, pending)",
        "Combine several criteria for more targeted results",
        "Use 'unassigned' to find tickets without an assignee",
    ],
    supported_tables: &[
        "incident - IT incidents and service requests",
        "change_request - change requests and maintenance",
        "sc_req_item - service catalog request items",
        "kb_knowledge - knowledge base articles",
    ],
};

pub fn catalogue() -> &'static ExampleCatalogue {
    &CATALOGUE
}
