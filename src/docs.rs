use crate::api::attendance::{
    AttendanceQuery, CheckinRequest, DayQuery, IssueTokenResponse, MarkAttendance, TodayResponse,
};
use crate::attendance::state::AttendanceState;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, AttendanceSummary, CheckinToken};
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "WorkFlowX Attendance API",
        version = "1.0.0",
        description = r#"
## WorkFlowX QR-code attendance

Daily check-in and check-out for WorkFlowX employees.

### 🔹 Flow
- **HR/Admin** requests today's check-in token and renders the returned link as a QR code
- **Employees** scan it to check in; a check-in before the cutoff (default 09:20) is *Present*, later is *Late*
- **Employees** check out at the end of the day; worked hours are recorded
- **HR/Admin** can mark a day by hand, which is the only way a day becomes *Absent*
- **HR/Admin** can list everyone's record for a day to see who has not checked in

### 🔐 Security
All endpoints require a **JWT Bearer** access token issued by the WorkFlowX auth service.

### 📦 Response Format
- JSON responses
- Business-rule failures carry a stable `code` next to the human readable `message`
"#,
    ),
    paths(
        crate::api::attendance::issue_token,
        crate::api::attendance::check_in,
        crate::api::attendance::qr_check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::today,
        crate::api::attendance::mark_attendance,
        crate::api::attendance::summary,
        crate::api::attendance::list_records,
        crate::api::attendance::day_sheet
    ),
    components(
        schemas(
            AttendanceRecord,
            AttendanceStatus,
            AttendanceSummary,
            AttendanceState,
            CheckinToken,
            IssueTokenResponse,
            CheckinRequest,
            MarkAttendance,
            AttendanceQuery,
            DayQuery,
            TodayResponse
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "QR-code attendance APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}
