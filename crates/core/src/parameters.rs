use std::collections::BTreeMap;

use crate::domain::parameter::{ParameterDefinition, ParameterType};

/// Ordered parameter lists per service. Declaration order is the question order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParameterSchemaRegistry {
    services: BTreeMap<String, Vec<ParameterDefinition>>,
}

impl ParameterSchemaRegistry {
    pub fn new(services: BTreeMap<String, Vec<ParameterDefinition>>) -> Self {
        Self { services }
    }

    pub fn builtin() -> Self {
        let services = [
            ("interior_design", interior_design()),
            ("construction", construction()),
            ("home_automation", home_automation()),
            ("painting", painting()),
            ("solar_services", solar_services()),
            ("electrical_services", electrical_services()),
        ]
        .into_iter()
        .map(|(service, parameters)| (service.to_owned(), parameters))
        .collect();

        Self { services }
    }

    /// Empty for unknown services.
    pub fn parameters(&self, service: &str) -> &[ParameterDefinition] {
        self.services.get(service).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn parameter(&self, service: &str, parameter_id: &str) -> Option<&ParameterDefinition> {
        self.parameters(service).iter().find(|parameter| parameter.id == parameter_id)
    }

    pub fn contains_service(&self, service: &str) -> bool {
        self.services.contains_key(service)
    }

    pub fn services(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }
}

fn choice(
    id: &str,
    label: &str,
    goal: &str,
    options: &[&str],
    expected_format: &str,
) -> ParameterDefinition {
    ParameterDefinition {
        id: id.to_owned(),
        label: label.to_owned(),
        kind: ParameterType::Choice,
        goal: goal.to_owned(),
        options: options.iter().map(|option| (*option).to_owned()).collect(),
        expected_format: Some(expected_format.to_owned()),
        allow_multiple: false,
    }
}

fn free_text(id: &str, label: &str, goal: &str, expected_format: &str) -> ParameterDefinition {
    ParameterDefinition {
        id: id.to_owned(),
        label: label.to_owned(),
        kind: ParameterType::Text,
        goal: goal.to_owned(),
        options: Vec::new(),
        expected_format: Some(expected_format.to_owned()),
        allow_multiple: false,
    }
}

fn interior_design() -> Vec<ParameterDefinition> {
    vec![
        choice(
            "spaceType",
            "Space Type",
            "Identify project category",
            &["Home", "Apartment", "Villa/Farmhouse", "Commercial Project", "Other"],
            "Choose from: Home, Apartment, Villa/Farmhouse, Commercial Project, or Other",
        ),
        choice(
            "areaSqft",
            "Area (sqft)",
            "Determine scale and budget mapping",
            &[
                "500-800 sqft",
                "801-1200 sqft",
                "1201-1600 sqft",
                "1601-2000 sqft",
                "More than 2000 sqft",
                "Other",
            ],
            "Choose a range for the area in square feet",
        ),
        choice(
            "bhkRoomCount",
            "Room / BHK Count",
            "Define layout complexity",
            &["Studio/1BHK", "2BHK", "3BHK", "4BHK/Villa", "Other"],
            "Choose the number of rooms or BHK configuration",
        ),
        choice(
            "stylePreference",
            "Style Preference",
            "Creative direction",
            &[
                "Modern/Contemporary",
                "Neo-Indian/Traditional",
                "European",
                "Japandi",
                "Not Sure",
                "Other",
            ],
            "Choose your preferred design style",
        ),
        choice(
            "budgetRange",
            "Budget Range (₹)",
            "Material & planning alignment",
            &["1-3 Lakhs", "3-5 Lakhs", "5-8 Lakhs", "More than 8 Lakhs", "Flexible", "Other"],
            "Choose your approximate budget range in Lakhs",
        ),
        choice(
            "timeline",
            "Timeline",
            "Pacing for milestones",
            &["45-60 Days", "61-90 Days", "More than 90 days", "Flexible", "Other"],
            "Choose your desired project timeline",
        ),
        choice(
            "floorPlanAvailability",
            "Floor Plan Availability",
            "Quotation accuracy",
            &["Yes", "No", "Other"],
            "Do you have a floor plan available?",
        ),
        choice(
            "specialZonesFocus",
            "Special Zones / Focus Areas",
            "Priority areas",
            &["Living Room", "Bedroom", "Kids Room", "All rooms", "Other"],
            "Choose any special focus areas",
        ),
        free_text(
            "inspirationsMoodboard",
            "Inspirations / Moodboard",
            "Mood & theme cues",
            "Please describe any ideas or inspirations you have",
        ),
    ]
}

fn construction() -> Vec<ParameterDefinition> {
    vec![
        choice(
            "plotSize",
            "Plot Size",
            "Foundation & scope estimation",
            &[
                "<1200 sqft",
                "1200-2400 sqft",
                "2401-4000 sqft",
                "4001-6000 sqft",
                "6000+ sqft",
                "Not Sure",
                "Other",
            ],
            "Choose a range for plot size in square feet",
        ),
        choice(
            "plotType",
            "Plot Type / Zone",
            "Approval norms",
            &["BBMP", "DTCP", "BMRDA", "Panchayat", "Private Site", "Not Sure", "Other"],
            "Choose from: BBMP, DTCP, BMRDA, Panchayat, Private Site, Not Sure, or Other",
        ),
        choice(
            "approvalStatus",
            "Approval Status",
            "Readiness for design",
            &["Yes", "No", "In Progress", "Not Started", "Not Sure"],
            "Choose approval status: Yes, No, In Progress, Not Started, or Not Sure",
        ),
        choice(
            "soilTestStatus",
            "Soil Test Status",
            "Safety pre-check",
            &["Yes (report available)", "Scheduled", "No", "Not Sure"],
            "Choose: Yes (report available), Scheduled, No, or Not Sure",
        ),
        choice(
            "numberOfFloors",
            "Number of Floors",
            "Structural base",
            &["G", "G+1", "G+2", "G+3", "4+ Floors", "Not Sure"],
            "Choose floors: G, G+1, G+2, G+3, 4+ Floors, or Not Sure",
        ),
        choice(
            "structureType",
            "Structure Type",
            "RCC vs alternatives",
            &["RCC Frame", "Load Bearing", "Hybrid", "Steel Frame", "Not Sure"],
            "Choose from: RCC Frame, Load Bearing, Hybrid, Steel Frame, or Not Sure",
        ),
        choice(
            "constructionStage",
            "Construction Stage",
            "New vs ongoing",
            &["New Project", "Mid-way Construction", "Renovation", "Extension"],
            "Choose from: New Project, Mid-way Construction, Renovation, or Extension",
        ),
        choice(
            "timeline",
            "Timeline",
            "Schedule planning",
            &["< 3 months", "3–6 months", "6–9 months", "> 9 months", "Flexible", "Not Sure"],
            "Choose your target timeline",
        ),
        choice(
            "budgetRange",
            "Budget Range (₹)",
            "Material & phases",
            &["< ₹20L", "₹20–35L", "₹35–50L", "₹50–75L", "₹75L+", "Flexible", "Not Sure"],
            "Choose a budget range in Lakhs",
        ),
    ]
}

fn home_automation() -> Vec<ParameterDefinition> {
    let mut focus = choice(
        "automationFocus",
        "Automation Focus",
        "Lighting/security/climate",
        &[
            "Lighting & Ambience",
            "Security & Safety",
            "Climate & Energy",
            "Entertainment & Media",
            "Whole Home Suite",
            "Not Sure",
        ],
        "You can choose multiple: Lighting & Ambience, Security & Safety, Climate & Energy, Entertainment & Media, Whole Home Suite, or Not Sure",
    );
    focus.allow_multiple = true;

    vec![
        choice(
            "homeType",
            "Home Type",
            "Wiring vs retrofit",
            &["New Build", "Existing Home", "Under Construction", "Rental Property", "Not Sure"],
            "Choose from: New Build, Existing Home, Under Construction, Rental Property, or Not Sure",
        ),
        focus,
        choice(
            "roomsToAutomate",
            "Rooms to Automate",
            "Device count & mapping",
            &[
                "Living Room & Common Areas",
                "Bedrooms",
                "Kitchen & Dining",
                "Entire Home",
                "Specific Zones Only",
                "Not Decided",
            ],
            "Choose rooms: Living Room & Common Areas, Bedrooms, Kitchen & Dining, Entire Home, Specific Zones Only, or Not Decided",
        ),
        choice(
            "powerBackupInverter",
            "Power Backup",
            "System compatibility",
            &["Yes (already installed)", "Planning to install", "No backup", "Not Sure"],
            "Choose: Yes (already installed), Planning to install, No backup, or Not Sure",
        ),
        choice(
            "wifiNetworkStrength",
            "Wi-Fi Strength",
            "Ecosystem stability",
            &[
                "Strong throughout home",
                "Moderate (few weak spots)",
                "Weak (needs upgrade)",
                "Currently no Wi-Fi",
                "Need on-site assessment",
            ],
            "Choose Wi-Fi status: Strong, Moderate, Weak, No Wi-Fi, or Need assessment",
        ),
        choice(
            "ecosystemPreference",
            "Ecosystem Preference",
            "Voice/app-based",
            &[
                "Amazon Alexa",
                "Google Assistant",
                "Apple HomeKit",
                "App-based Only",
                "Open to suggestions",
            ],
            "Choose: Amazon Alexa, Google Assistant, Apple HomeKit, App-based Only, or Open to suggestions",
        ),
        choice(
            "securityPriority",
            "Security Priority",
            "Cameras/sensors",
            &["High (CCTV & sensors)", "Medium (basic alerts)", "Low priority", "Not Sure"],
            "Choose security focus: High, Medium, Low, or Not Sure",
        ),
        choice(
            "budgetTier",
            "Budget Tier",
            "Product planning",
            &["Economical", "Mid-range", "Premium", "Luxury", "Flexible"],
            "Choose budget tier: Economical, Mid-range, Premium, Luxury, or Flexible",
        ),
        choice(
            "lifestylePatterns",
            "Lifestyle Patterns",
            "Scene intelligence",
            &[
                "Working professionals",
                "Mostly at home",
                "Senior-friendly home",
                "Rental / AirBnB",
                "Vacation / Second Home",
                "Not Sure",
            ],
            "Choose: Working professionals, Mostly at home, Senior-friendly, Rental/AirBnB, Vacation home, or Not Sure",
        ),
    ]
}

fn painting() -> Vec<ParameterDefinition> {
    vec![
        choice(
            "propertyType",
            "Property Type",
            "Surface preparation context",
            &["Apartment", "Independent House", "Villa", "Office Space", "Retail/Commercial", "Other"],
            "Choose from: Apartment, Independent House, Villa, Office Space, Retail/Commercial, or Other",
        ),
        choice(
            "interiorOrExterior",
            "Interior or Exterior",
            "Product family",
            &["Interior Only", "Exterior Only", "Both Interior & Exterior", "Feature Walls Only"],
            "Choose from: Interior Only, Exterior Only, Both Interior & Exterior, or Feature Walls Only",
        ),
        choice(
            "surfaceCondition",
            "Surface Condition",
            "Repair / damp proofing",
            &[
                "Fresh / Good condition",
                "Minor cracks or flaking",
                "Damp patches present",
                "Peeling / bubbling paint",
                "Major repair needed",
                "Not Sure",
            ],
            "Choose condition: Fresh, Minor cracks, Damp patches, Peeling, Major repair, or Not Sure",
        ),
        choice(
            "oldPaintType",
            "Old Paint Type",
            "Primer compatibility",
            &["Emulsion", "Enamel", "Distemper", "Not Sure", "No Previous Paint"],
            "Choose from: Emulsion, Enamel, Distemper, Not Sure, or No Previous Paint",
        ),
        choice(
            "colourThemeIntent",
            "Colour Theme / Intent",
            "Visual direction",
            &[
                "Warm & Cozy",
                "Soft Pastels",
                "Earthy / Natural",
                "Bright & Vibrant",
                "Monochrome / Minimal",
                "Accent Feature Wall",
                "Not Sure",
            ],
            "Choose your colour mood: Warm, Pastels, Earthy, Vibrant, Monochrome, Feature Wall, or Not Sure",
        ),
        choice(
            "finishPreference",
            "Finish Preference",
            "Product-level decision",
            &["Matte", "Eggshell", "Satin", "Semi-Gloss", "High Gloss", "Not Sure"],
            "Choose from: Matte, Eggshell, Satin, Semi-Gloss, High Gloss, or Not Sure",
        ),
        choice(
            "totalAreaSqft",
            "Total Area (sqft)",
            "Quantity estimation",
            &[
                "< 800 sqft",
                "800 - 1200 sqft",
                "1201 - 1800 sqft",
                "1801 - 2500 sqft",
                "2500+ sqft",
                "Not Sure",
            ],
            "Choose the total paintable area range",
        ),
        choice(
            "timeline",
            "Timeline",
            "Resource planning",
            &["Within 1 week", "1-2 weeks", "3-4 weeks", "Next month", "Flexible", "Just exploring"],
            "Choose your preferred project window",
        ),
        choice(
            "budgetBrandFlexibility",
            "Budget / Brand Flexibility",
            "Recommendations",
            &[
                "Economical (< ₹40k)",
                "Mid-range (₹40k - ₹70k)",
                "Premium (₹70k - ₹1.2L)",
                "Luxury (₹1.2L+)",
                "Brand agnostic",
                "Specific premium brands only",
            ],
            "Choose budget range or brand preference",
        ),
    ]
}

fn solar_services() -> Vec<ParameterDefinition> {
    vec![
        choice(
            "propertyType",
            "Property Type",
            "Determines load & roof area",
            &[
                "Independent House",
                "Apartment",
                "Villa",
                "Commercial Building",
                "Industrial Shed",
                "Institutional / School",
                "Other",
            ],
            "Choose from: Independent House, Apartment, Villa, Commercial Building, Industrial Shed, Institutional/School, or Other",
        ),
        choice(
            "roofTypeOrientation",
            "Roof Type & Orientation",
            "Feasibility for panels",
            &[
                "Flat RCC terrace (open)",
                "Tiled / Sloped roof",
                "Metal sheet roof",
                "Mixed terrace + utilities",
                "Partially shaded terrace",
                "Ground-mounted area",
                "Not Sure",
            ],
            "Choose roof type / orientation or select Not Sure",
        ),
        choice(
            "availableRoofAreaSqft",
            "Available Roof Area (sqft)",
            "Panel capacity calculation",
            &[
                "< 200 sqft (1-2 kW)",
                "200 - 400 sqft (2-4 kW)",
                "401 - 650 sqft (4-6 kW)",
                "651 - 900 sqft (6-8 kW)",
                "901+ sqft (8 kW+)",
                "Not Sure",
            ],
            "Choose the approximate usable sunlit area",
        ),
        choice(
            "monthlyBillInr",
            "Current Electricity Bill (₹/month)",
            "Load estimation (kWh/day)",
            &[
                "< ₹1,500",
                "₹1,500 - ₹3,000",
                "₹3,001 - ₹5,000",
                "₹5,001 - ₹8,000",
                "₹8,001+",
                "Seasonal spikes only",
                "Not Sure",
            ],
            "Choose your average monthly bill band",
        ),
        choice(
            "desiredSolarType",
            "Desired Solar Type",
            "System design choice",
            &["On-grid", "Hybrid", "Off-grid", "Not Sure"],
            "Choose from: On-grid, Hybrid, Off-grid, Not Sure",
        ),
        choice(
            "backupRequirement",
            "Backup Requirement",
            "Battery sizing",
            &[
                "Yes, power cuts are frequent",
                "Yes, want critical load backup",
                "No, grid is reliable",
                "Considering later",
                "Not Sure",
            ],
            "Choose your backup requirement preference",
        ),
        choice(
            "budgetRange",
            "Budget Range (₹)",
            "Proposal alignment",
            &[
                "₹1.5L - ₹2.5L",
                "₹2.5L - ₹4L",
                "₹4L - ₹6L",
                "₹6L+",
                "Exploring financing options",
                "Flexible / need guidance",
            ],
            "Choose a budget band or financing preference",
        ),
        choice(
            "interestedInSubsidy",
            "Interest in Subsidy",
            "Determine policy applicability",
            &[
                "Yes, residential subsidy",
                "Yes, commercial scheme",
                "Need help understanding eligibility",
                "No, not required",
            ],
            "Choose your subsidy interest",
        ),
        choice(
            "installationTimeline",
            "Timeline / Installation Goal",
            "Planning and vendor sync",
            &["Within 1 month", "1-2 months", "This quarter", "After monsoon", "Just exploring options"],
            "Choose your target installation window",
        ),
    ]
}

fn electrical_services() -> Vec<ParameterDefinition> {
    vec![
        choice(
            "propertyType",
            "Property Type",
            "Establish project scale and wiring complexity",
            &["Apartment", "Independent House", "Villa", "Office Space", "Retail/Commercial", "Other"],
            "Choose from: Apartment, Independent House, Villa, Office Space, Retail/Commercial, or Other",
        ),
        choice(
            "wiringAge",
            "Age of Wiring (years)",
            "Safety indicator for risk assessment",
            &["< 5 years", "5–10 years", "10–15 years", "15+ years", "Not Sure"],
            "Choose approximate age band or Not Sure",
        ),
        choice(
            "powerIssues",
            "Frequent Power Issues",
            "Detect voltage fluctuations or circuit problems",
            &[
                "Frequent tripping",
                "Flickering lights",
                "Sparks or burnt smell",
                "Electric shocks",
                "Overheating plugs/sockets",
                "None",
                "Other",
            ],
            "Choose the most relevant issue or None/Other",
        ),
        choice(
            "mainPowerSource",
            "Main Power Source",
            "Understand grid/inverter/solar mix",
            &[
                "Grid Only",
                "Grid + Inverter",
                "Grid + Solar",
                "Grid + Solar + Inverter",
                "DG Backup",
                "Other",
            ],
            "Choose from: Grid Only, Grid + Inverter, Grid + Solar, Grid + Solar + Inverter, DG Backup, or Other",
        ),
        choice(
            "inverterBackup",
            "Inverter / Backup System",
            "Integration and load management",
            &["Yes (installed)", "Planning to install", "No backup", "Not Sure"],
            "Choose: Yes (installed), Planning to install, No backup, or Not Sure",
        ),
        choice(
            "applianceLoad",
            "Appliance Load Summary",
            "Estimate power consumption",
            &[
                "Light (no AC/geyser)",
                "Moderate (1 AC or geyser)",
                "Heavy (2+ ACs / heavy kitchen)",
                "Mixed household + office",
                "Not Sure",
            ],
            "Choose load profile: Light, Moderate, Heavy, Mixed, or Not Sure",
        ),
        choice(
            "earthingSafety",
            "Earthing & Safety Devices",
            "Compliance check for safety systems",
            &["Yes (with ELCB/RCCB)", "Only MCB", "No", "Not Sure"],
            "Choose from: Yes (with ELCB/RCCB), Only MCB, No, or Not Sure",
        ),
        choice(
            "renovationGoal",
            "Renovation or Maintenance Goal",
            "Define service scope",
            &[
                "Safety Inspection",
                "Repair/Troubleshooting",
                "Partial Upgrade",
                "Full Rewiring",
                "Automation Integration",
                "New Installation",
                "Other",
            ],
            "Choose from: Safety Inspection, Repair/Troubleshooting, Partial Upgrade, Full Rewiring, Automation Integration, New Installation, or Other",
        ),
        choice(
            "budgetRange",
            "Budget Range (₹)",
            "Align scope with financial planning",
            &["< ₹10k", "₹10k - ₹25k", "₹25k - ₹50k", "₹50k+", "Flexible / Need quote"],
            "Choose a budget band for the electrical work",
        ),
        choice(
            "timeline",
            "Timeline / Urgency",
            "Scheduling service priority",
            &["ASAP", "This week", "1–2 weeks", "This month", "Flexible"],
            "Choose your preferred schedule window",
        ),
    ]
}
