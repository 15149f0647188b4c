//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode},
};
use chrono::NaiveDate;
use darasa_core::{
  grade::Grade,
  school::{NewSchool, NewStaff, NewStudent, NewUser, Role, School, Staff, Student},
  store::SchoolStore,
  subject::SUBJECTS,
};
use darasa_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{
  api_router,
  context::{ROLE_HEADER, USER_HEADER},
};

type Store = Arc<SqliteStore>;

async fn store() -> Store {
  Arc::new(SqliteStore::open_in_memory().await.unwrap())
}

async fn call(
  store: &Store,
  method: &str,
  uri: &str,
  actor: Option<(i64, Role)>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some((user_id, role)) = actor {
    builder = builder
      .header(USER_HEADER, user_id.to_string())
      .header(ROLE_HEADER, role.to_string());
  }
  let req = match body {
    Some(json) => builder
      .header("content-type", "application/json")
      .body(Body::from(json.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let resp = api_router(store.clone()).oneshot(req).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
  };
  (status, value)
}

// ─── Fixtures ────────────────────────────────────────────────────────────────

async fn school(s: &Store, name: &str, county: &str) -> School {
  s.add_school(NewSchool {
    school_name:          name.into(),
    county:               county.into(),
    sub_county:           "Central".into(),
    ward:                 "Ward".into(),
    registration_id:      None,
    date_of_registration: None,
    school_level:         "Primary".into(),
    school_category:      "Public".into(),
  })
  .await
  .unwrap()
}

async fn staff(s: &Store, school_id: i64, username: &str, role: Role, level: Option<u8>) -> Staff {
  let user = s
    .add_user(NewUser { username: username.into(), email: "x@y.test".into(), role })
    .await
    .unwrap();
  s.add_staff(NewStaff {
    user_id: user.user_id,
    school_id,
    name: username.into(),
    email: "x@y.test".into(),
    mobile_number: "0700".into(),
    qualification: "B.Ed".into(),
    role,
    assigned_grade: level.map(|n| Grade::new(n).unwrap()),
  })
  .await
  .unwrap()
}

async fn student(s: &Store, school_id: i64, level: u8, name: &str) -> Student {
  s.add_student(NewStudent {
    school_id,
    user_id: None,
    name: name.into(),
    date_of_birth: NaiveDate::from_ymd_opt(2013, 6, 1).unwrap(),
    gender: "M".into(),
    current_grade: Grade::new(level).unwrap(),
    guardian_name: "Mama".into(),
    guardian_phone: "0722".into(),
    guardian_email: None,
    nationality: "Kenyan".into(),
    student_email: None,
  })
  .await
  .unwrap()
}

fn sheet(student_id: i64, maths: i64) -> Value {
  let subjects: serde_json::Map<String, Value> = SUBJECTS
    .iter()
    .map(|s| {
      let score = if s.key == "maths" { maths } else { 60 };
      (s.key.to_owned(), json!({ "score": score, "reflection": "steady" }))
    })
    .collect();
  json!({
    "student_id": student_id,
    "term": "Term 1",
    "year": 2024,
    "subjects": subjects,
  })
}

/// A `POST /students` body without school or grade.
fn enrolment(name: &str) -> Value {
  json!({
    "name": name,
    "date_of_birth": "2014-05-09",
    "gender": "F",
    "guardian_name": "Baba",
    "guardian_phone": "0711222333",
    "nationality": "Kenyan",
  })
}

// ─── Actor context ───────────────────────────────────────────────────────────

#[tokio::test]
async fn requests_without_identity_are_unauthorized() {
  let s = store().await;
  let (status, body) = call(&s, "GET", "/performance?school_id=1&grade=Grade%205", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert!(body["error"].as_str().unwrap().contains(USER_HEADER));
}

#[tokio::test]
async fn wrong_role_is_forbidden() {
  let s = store().await;
  let (status, _) = call(
    &s,
    "POST",
    "/transitions",
    Some((1, Role::Student)),
    Some(json!({ "student_ids": [1] })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ─── Performance ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn teacher_records_and_reads_back_performance() {
  let s = store().await;
  let sc = school(&s, "A", "Nairobi").await;
  let t = staff(&s, sc.school_id, "mwalimu", Role::Teacher, Some(5)).await;
  let kid = student(&s, sc.school_id, 5, "Juma").await;
  let teacher = Some((t.user_id, Role::Teacher));

  let (status, body) = call(&s, "POST", "/performance", teacher, Some(sheet(kid.student_id, 84))).await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  assert_eq!(body["total_score"], 744);
  assert_eq!(body["average_score"], 62.0);
  assert_eq!(body["school_id"], sc.school_id);

  let uri = format!("/performance?school_id={}&grade=Grade%205", sc.school_id);
  let (status, rows) = call(&s, "GET", &uri, teacher, None).await;
  assert_eq!(status, StatusCode::OK);
  let rows = rows.as_array().unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0]["student_name"], "Juma");
  assert_eq!(rows[0]["teacher_name"], "mwalimu");
  assert_eq!(rows[0]["current_grade"], "Grade 5");

  let uri = format!("/performance/report?student_id={}&term=Term%201&year=2024", kid.student_id);
  let (status, report) = call(&s, "GET", &uri, teacher, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(report["subjects"][0]["score"], 84);
}

#[tokio::test]
async fn invalid_and_duplicate_records_are_rejected() {
  let s = store().await;
  let sc = school(&s, "A", "Nairobi").await;
  let t = staff(&s, sc.school_id, "mwalimu", Role::Teacher, Some(5)).await;
  let kid = student(&s, sc.school_id, 5, "Juma").await;
  let teacher = Some((t.user_id, Role::Teacher));

  let (status, body) = call(&s, "POST", "/performance", teacher, Some(sheet(kid.student_id, 101))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("Maths"), "{body}");

  let (status, _) = call(&s, "POST", "/performance", teacher, Some(sheet(kid.student_id, 50))).await;
  assert_eq!(status, StatusCode::CREATED);
  let (status, _) = call(&s, "POST", "/performance", teacher, Some(sheet(kid.student_id, 70))).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn teacher_cannot_record_for_another_school() {
  let s = store().await;
  let a = school(&s, "A", "Nairobi").await;
  let b = school(&s, "B", "Nairobi").await;
  let t = staff(&s, a.school_id, "mwalimu", Role::Teacher, Some(5)).await;
  let elsewhere = student(&s, b.school_id, 5, "Juma").await;

  let (status, _) = call(
    &s,
    "POST",
    "/performance",
    Some((t.user_id, Role::Teacher)),
    Some(sheet(elsewhere.student_id, 50)),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let uri = format!("/performance?school_id={}&grade=Grade%205", b.school_id);
  let (status, _) = call(&s, "GET", &uri, Some((t.user_id, Role::Teacher)), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn class_view_requires_school_and_grade() {
  let s = store().await;
  let admin = Some((1, Role::SystemAdmin));
  let (status, body) = call(&s, "GET", "/performance?school_id=1", admin, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains("grade"));
}

#[tokio::test]
async fn missing_report_is_not_found() {
  let s = store().await;
  let (status, _) = call(
    &s,
    "GET",
    "/performance/report?student_id=7&term=Term%202&year=2024",
    Some((1, Role::SystemAdmin)),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn summary_rejects_unknown_subjects() {
  let s = store().await;
  let sc = school(&s, "A", "Nairobi").await;
  let admin = Some((1, Role::SystemAdmin));

  let uri = format!("/performance/summary?school_id={}&subject=latin", sc.school_id);
  let (status, _) = call(&s, "GET", &uri, admin, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  student(&s, sc.school_id, 4, "Juma").await;
  let uri = format!("/performance/summary?school_id={}&subject=maths", sc.school_id);
  let (status, body) = call(&s, "GET", &uri, admin, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body[0]["grade"], "Grade 4");
  assert_eq!(body[0]["student_count"], 1);
  assert_eq!(body[0]["averages"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn report_card_is_scoped_to_the_readers_school() {
  let s = store().await;
  let a = school(&s, "A", "Nairobi").await;
  let b = school(&s, "B", "Nairobi").await;
  let coast = school(&s, "Coast", "Mombasa").await;
  let ours = staff(&s, a.school_id, "ours", Role::Teacher, Some(5)).await;
  let theirs = staff(&s, b.school_id, "theirs", Role::Teacher, Some(5)).await;
  let nairobi_admin = staff(&s, b.school_id, "nairobi_admin", Role::CountyAdmin, None).await;
  let coast_admin = staff(&s, coast.school_id, "coast_admin", Role::CountyAdmin, None).await;
  let kid = student(&s, a.school_id, 5, "Juma").await;
  let (status, _) = call(
    &s,
    "POST",
    "/performance",
    Some((ours.user_id, Role::Teacher)),
    Some(sheet(kid.student_id, 70)),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let uri = format!("/performance/report?student_id={}&term=Term%201&year=2024", kid.student_id);
  for (actor, expected) in [
    ((ours.user_id, Role::Teacher), StatusCode::OK),
    ((theirs.user_id, Role::Teacher), StatusCode::FORBIDDEN),
    ((nairobi_admin.user_id, Role::CountyAdmin), StatusCode::OK),
    ((coast_admin.user_id, Role::CountyAdmin), StatusCode::FORBIDDEN),
    ((99, Role::SystemAdmin), StatusCode::OK),
  ] {
    let (status, body) = call(&s, "GET", &uri, Some(actor), None).await;
    assert_eq!(status, expected, "{actor:?}: {body}");
  }

  let uri = format!("/performance?school_id={}&grade=Grade%205", a.school_id);
  let (status, _) =
    call(&s, "GET", &uri, Some((coast_admin.user_id, Role::CountyAdmin)), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn student_reads_their_report_once_their_account_exists() {
  let s = store().await;
  let sc = school(&s, "A", "Nairobi").await;
  let t = staff(&s, sc.school_id, "mwalimu", Role::Teacher, Some(5)).await;
  let teacher = Some((t.user_id, Role::Teacher));

  let mut body = enrolment("Juma");
  body["student_email"] = json!("juma@pupil.test");
  let (status, enrolled) = call(&s, "POST", "/students", teacher, Some(body)).await;
  assert_eq!(status, StatusCode::CREATED, "{enrolled}");
  assert_eq!(enrolled["user_id"], Value::Null);
  let student_id = enrolled["student_id"].as_i64().unwrap();
  let (status, _) = call(&s, "POST", "/performance", teacher, Some(sheet(student_id, 70))).await;
  assert_eq!(status, StatusCode::CREATED);

  let (status, account) = call(
    &s,
    "POST",
    "/users",
    Some((1, Role::SystemAdmin)),
    Some(json!({ "username": "juma", "email": "juma@pupil.test", "role": "Student" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{account}");
  let user_id = account["user_id"].as_i64().unwrap();

  let uri = format!("/performance/report?student_id={student_id}&term=Term%201&year=2024");
  let (status, report) = call(&s, "GET", &uri, Some((user_id, Role::Student)), None).await;
  assert_eq!(status, StatusCode::OK, "{report}");
  assert_eq!(report["student_name"], "Juma");

  let (status, _) = call(&s, "GET", &uri, Some((user_id + 100, Role::Student)), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ─── Transitions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn teacher_moves_the_class_up() {
  let s = store().await;
  let sc = school(&s, "A", "Nairobi").await;
  let t = staff(&s, sc.school_id, "mwalimu", Role::Teacher, Some(5)).await;
  let x = student(&s, sc.school_id, 5, "X").await;
  let y = student(&s, sc.school_id, 5, "Y").await;
  let teacher = Some((t.user_id, Role::Teacher));

  let (status, body) = call(
    &s,
    "POST",
    "/transitions",
    teacher,
    Some(json!({ "student_ids": [x.student_id, y.student_id] })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert!(body.as_array().unwrap().iter().all(|st| st["current_grade"] == "Grade 6"));

  // They are no longer in the teacher's grade.
  let uri = format!("/students/{}/transition", x.student_id);
  let (status, _) = call(&s, "POST", &uri, teacher, None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

// ─── Transfers ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn transfer_request_and_approval() {
  let s = store().await;
  let from = school(&s, "From", "Nairobi").await;
  let to = school(&s, "To", "Nairobi").await;
  let coast = school(&s, "Coast", "Mombasa").await;
  let head = staff(&s, from.school_id, "head", Role::HeadTeacher, None).await;
  let admin = staff(&s, to.school_id, "admin", Role::CountyAdmin, None).await;
  let coast_admin = staff(&s, coast.school_id, "coast_admin", Role::CountyAdmin, None).await;
  let kid = student(&s, from.school_id, 6, "Kid").await;
  let admin_actor = Some((admin.user_id, Role::CountyAdmin));

  let (status, transfer) = call(
    &s,
    "POST",
    "/transfers",
    Some((head.user_id, Role::HeadTeacher)),
    Some(json!({ "student_id": kid.student_id, "to_school_id": to.school_id })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{transfer}");
  assert_eq!(transfer["status"], "Pending");
  let id = transfer["transfer_id"].as_i64().unwrap();

  let (status, pending) = call(&s, "GET", "/transfers", admin_actor, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(pending.as_array().unwrap().len(), 1);
  assert_eq!(pending[0]["student_name"], "Kid");

  let (status, _) = call(
    &s,
    "GET",
    "/transfers?county=Nairobi",
    Some((coast_admin.user_id, Role::CountyAdmin)),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, decided) =
    call(&s, "POST", &format!("/transfers/{id}/approve"), admin_actor, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(decided["status"], "Approved");
  let moved = s.get_student(kid.student_id).await.unwrap().unwrap();
  assert_eq!(moved.school_id, to.school_id);

  let (status, _) = call(&s, "POST", &format!("/transfers/{id}/reject"), admin_actor, None).await;
  assert_eq!(status, StatusCode::CONFLICT);
}

// ─── Counties ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn county_admin_reads_only_their_county() {
  let s = store().await;
  let sc = school(&s, "A", "Nairobi").await;
  let admin = staff(&s, sc.school_id, "admin", Role::CountyAdmin, None).await;
  let actor = Some((admin.user_id, Role::CountyAdmin));

  let (status, body) = call(&s, "GET", "/counties/Nairobi/overview", actor, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["county"], "Nairobi");
  assert_eq!(body["students_assessed"], 0);

  let (status, _) = call(&s, "GET", "/counties/Kisumu/report", actor, None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = call(
    &s,
    "GET",
    "/counties/Kisumu/report",
    Some((99, Role::SystemAdmin)),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body, json!([]));
}

// ─── Registry ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn system_admin_registers_schools() {
  let s = store().await;
  let admin = Some((1, Role::SystemAdmin));
  let body = json!({
    "school_name": "Mwangaza",
    "county": "Nakuru",
    "sub_county": "Naivasha",
    "ward": "Lakeview",
    "date_of_registration": "2019-02-01",
    "school_level": "Primary",
    "school_category": "Private",
  });

  let (status, created) = call(&s, "POST", "/schools", admin, Some(body.clone())).await;
  assert_eq!(status, StatusCode::CREATED, "{created}");
  let id = created["school_id"].as_i64().unwrap();

  let (status, _) = call(&s, "POST", "/schools", admin, Some(body.clone())).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, _) = call(&s, "POST", "/schools", Some((2, Role::Teacher)), Some(body)).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, fetched) = call(&s, "GET", &format!("/schools/{id}"), admin, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(fetched["date_of_registration"], "2019-02-01");

  let (status, _) = call(&s, "GET", "/schools/404", admin, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn teacher_lists_only_their_school() {
  let s = store().await;
  let a = school(&s, "A", "Nairobi").await;
  let b = school(&s, "B", "Nairobi").await;
  let t = staff(&s, a.school_id, "mwalimu", Role::Teacher, Some(5)).await;
  student(&s, a.school_id, 5, "Ours").await;
  student(&s, b.school_id, 5, "Theirs").await;

  let (status, body) = call(&s, "GET", "/students", Some((t.user_id, Role::Teacher)), None).await;
  assert_eq!(status, StatusCode::OK);
  let names: Vec<_> = body.as_array().unwrap().iter().map(|s| s["name"].clone()).collect();
  assert_eq!(names, vec![json!("Ours")]);

  let (status, body) = call(&s, "GET", "/staff", Some((t.user_id, Role::Teacher)), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["assigned_grade"], "Grade 5");
}

#[tokio::test]
async fn teacher_enrols_students_into_their_own_class() {
  let s = store().await;
  let a = school(&s, "A", "Nairobi").await;
  let b = school(&s, "B", "Nairobi").await;
  let t = staff(&s, a.school_id, "mwalimu", Role::Teacher, Some(5)).await;

  // School and grade come from the teacher's assignment.
  let mut body = enrolment("Wanjiku");
  body["school_id"] = json!(b.school_id);
  body["current_grade"] = json!("Grade 8");
  let (status, created) =
    call(&s, "POST", "/students", Some((t.user_id, Role::Teacher)), Some(body)).await;
  assert_eq!(status, StatusCode::CREATED, "{created}");
  assert_eq!(created["school_id"], a.school_id);
  assert_eq!(created["current_grade"], "Grade 5");

  let admin = Some((1, Role::SystemAdmin));
  let (status, _) = call(&s, "POST", "/students", admin, Some(enrolment("Njeri"))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let mut body = enrolment("Njeri");
  body["school_id"] = json!(b.school_id);
  body["current_grade"] = json!("Grade 8");
  let (status, created) = call(&s, "POST", "/students", admin, Some(body)).await;
  assert_eq!(status, StatusCode::CREATED, "{created}");
  assert_eq!(created["school_id"], b.school_id);
  assert_eq!(created["current_grade"], "Grade 8");

  let (status, _) =
    call(&s, "POST", "/students", Some((7, Role::Student)), Some(enrolment("Self"))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn teacher_edits_students_at_their_school() {
  let s = store().await;
  let a = school(&s, "A", "Nairobi").await;
  let b = school(&s, "B", "Nairobi").await;
  let t = staff(&s, a.school_id, "mwalimu", Role::Teacher, Some(5)).await;
  let kid = student(&s, a.school_id, 5, "Juma").await;
  let elsewhere = student(&s, b.school_id, 5, "Otieno").await;
  let teacher = Some((t.user_id, Role::Teacher));
  let edit = |name: &str, grade: &str| {
    json!({
      "name": name,
      "date_of_birth": "2013-06-01",
      "gender": "M",
      "current_grade": grade,
      "guardian_name": "Mama",
      "guardian_phone": "0722",
      "nationality": "Kenyan",
    })
  };

  let uri = format!("/students/{}", kid.student_id);
  let (status, body) = call(&s, "PUT", &uri, teacher, Some(edit("Juma Otieno", "Grade 6"))).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["name"], "Juma Otieno");
  assert_eq!(body["school_id"], a.school_id);
  let stored = s.get_student(kid.student_id).await.unwrap().unwrap();
  assert_eq!(stored.current_grade, Grade::new(6).unwrap());

  let (status, _) = call(&s, "PUT", &uri, teacher, Some(edit("Juma", "Grade 12"))).await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

  let other = format!("/students/{}", elsewhere.student_id);
  let (status, _) = call(&s, "PUT", &other, teacher, Some(edit("Otieno", "Grade 5"))).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call(&s, "PUT", "/students/999", teacher, Some(edit("Ghost", "Grade 5"))).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn head_teacher_registers_teachers_at_their_school() {
  let s = store().await;
  let a = school(&s, "A", "Nairobi").await;
  let b = school(&s, "B", "Nairobi").await;
  let head = staff(&s, a.school_id, "head", Role::HeadTeacher, None).await;
  let head_actor = Some((head.user_id, Role::HeadTeacher));
  let recruit = s
    .add_user(NewUser { username: "otieno".into(), email: "o@x.test".into(), role: Role::Teacher })
    .await
    .unwrap();

  let body = json!({
    "user_id": recruit.user_id,
    "school_id": b.school_id,
    "name": "Otieno",
    "email": "o@x.test",
    "mobile_number": "0733444555",
    "qualification": "Diploma",
    "role": "Teacher",
    "assigned_grade": "Grade 6",
  });
  let (status, created) = call(&s, "POST", "/staff", head_actor, Some(body)).await;
  assert_eq!(status, StatusCode::CREATED, "{created}");
  assert_eq!(created["school_id"], a.school_id);
  assert_eq!(created["assigned_grade"], "Grade 6");

  let hopeful = s
    .add_user(NewUser { username: "hopeful".into(), email: "h@x.test".into(), role: Role::CountyAdmin })
    .await
    .unwrap();
  let body = json!({
    "user_id": hopeful.user_id,
    "name": "Hopeful",
    "email": "h@x.test",
    "mobile_number": "0700",
    "qualification": "Masters",
    "role": "County Admin",
  });
  let (status, _) = call(&s, "POST", "/staff", head_actor, Some(body.clone())).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) =
    call(&s, "POST", "/staff", Some((recruit.user_id, Role::Teacher)), Some(body)).await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn head_teacher_edits_only_their_teachers() {
  let s = store().await;
  let a = school(&s, "A", "Nairobi").await;
  let b = school(&s, "B", "Nairobi").await;
  let head = staff(&s, a.school_id, "head", Role::HeadTeacher, None).await;
  let ours = staff(&s, a.school_id, "ours", Role::Teacher, Some(4)).await;
  let theirs = staff(&s, b.school_id, "theirs", Role::Teacher, Some(4)).await;
  let head_actor = Some((head.user_id, Role::HeadTeacher));
  let edit = json!({
    "name": "ours",
    "email": "ours@x.test",
    "mobile_number": "0700",
    "qualification": "Degree",
    "role": "Teacher",
    "assigned_grade": "Grade 7",
  });

  let (status, body) =
    call(&s, "PUT", &format!("/staff/{}", ours.staff_id), head_actor, Some(edit.clone())).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["assigned_grade"], "Grade 7");

  for target in [theirs.staff_id, head.staff_id] {
    let (status, _) =
      call(&s, "PUT", &format!("/staff/{target}"), head_actor, Some(edit.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
  }

  let (status, _) = call(&s, "PUT", "/staff/999", head_actor, Some(edit)).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn system_admin_edits_and_removes_users_and_schools() {
  let s = store().await;
  let admin = Some((1, Role::SystemAdmin));
  let sc = school(&s, "A", "Nairobi").await;
  let spare = school(&s, "Spare", "Nairobi").await;
  let kamau = s
    .add_user(NewUser { username: "kamau".into(), email: "k@x.test".into(), role: Role::Teacher })
    .await
    .unwrap();
  let busy = staff(&s, sc.school_id, "busy", Role::Teacher, Some(4)).await;

  let uri = format!("/users/{}", kamau.user_id);
  let edit = json!({ "username": "kamau_j", "email": "kj@x.test", "role": "Head Teacher" });
  let (status, body) = call(&s, "PUT", &uri, admin, Some(edit.clone())).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["username"], "kamau_j");
  assert_eq!(body["role"], "Head Teacher");
  let (status, _) = call(&s, "PUT", &uri, Some((busy.user_id, Role::Teacher)), Some(edit)).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, _) = call(&s, "DELETE", &format!("/users/{}", busy.user_id), admin, None).await;
  assert_eq!(status, StatusCode::CONFLICT);
  let (status, _) = call(&s, "DELETE", &uri, admin, None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = call(&s, "DELETE", &uri, admin, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let details = |name: &str| {
    json!({
      "school_name": name,
      "county": "Nairobi",
      "sub_county": "Embakasi",
      "ward": "East",
      "school_level": "Primary",
      "school_category": "Public",
    })
  };
  let school_uri = format!("/schools/{}", sc.school_id);
  let (status, body) = call(&s, "PUT", &school_uri, admin, Some(details("A Academy"))).await;
  assert_eq!(status, StatusCode::OK, "{body}");
  assert_eq!(body["sub_county"], "Embakasi");
  let (status, _) = call(&s, "PUT", &school_uri, admin, Some(details("Spare"))).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (status, _) = call(&s, "DELETE", &school_uri, admin, None).await;
  assert_eq!(status, StatusCode::CONFLICT);
  let spare_uri = format!("/schools/{}", spare.school_id);
  let (status, _) = call(&s, "DELETE", &spare_uri, admin, None).await;
  assert_eq!(status, StatusCode::NO_CONTENT);
  let (status, _) = call(&s, "GET", &spare_uri, admin, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}
