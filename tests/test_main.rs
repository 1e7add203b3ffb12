#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{Duration, Utc};
    use rocket::http::{ContentType, Cookie, Header, Status};
    use rocket::local::blocking::{Client, LocalResponse};
    use rocket::{get, routes};
    use serde_json::json;
    use todo_api::auth::{CurrentUser, TokenService};
    use todo_api::models::Todo;
    use todo_api::response::Envelope;
    use todo_api::store::MemoryStore;
    use todo_api::AppState;
    use uuid::Uuid;

    const SECRET: &str = "integration test secret";

    fn tokens() -> TokenService {
        TokenService::new(SECRET, Duration::days(7))
    }

    // Lowest bcrypt cost keeps the suite fast.
    fn test_state() -> AppState {
        AppState::with_store(Arc::new(MemoryStore::new()), tokens(), 4)
    }

    // Untracked so that a cookie from one login never rides along on another user's request.
    fn test_client() -> Client {
        Client::untracked(todo_api::rocket_instance(test_state(), "1")).expect("valid rocket instance")
    }

    fn bearer(token: &str) -> Header<'static> {
        Header::new("Authorization", format!("Bearer {}", token))
    }

    fn unique_email(tag: &str) -> String {
        format!("{}_{}@example.com", tag, Uuid::new_v4())
    }

    fn register(client: &Client, email: &str, password: &str) -> (i64, String) {
        let response = client
            .post("/api/v1/user/register")
            .header(ContentType::JSON)
            .body(json!({ "email": email, "password": password, "firstName": "Bob", "lastName": "Smith" }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::Created, "Registration failed");
        let body = response.into_json::<Envelope<()>>().unwrap();
        (body.resource_id.unwrap(), body.token.unwrap())
    }

    fn new_user(client: &Client, tag: &str) -> (i64, String) {
        register(client, &unique_email(tag), "password123")
    }

    fn create_todo<'c>(client: &'c Client, token: &str, body: serde_json::Value) -> LocalResponse<'c> {
        client
            .post("/api/v1/todos")
            .header(ContentType::JSON)
            .header(bearer(token))
            .body(body.to_string())
            .dispatch()
    }

    fn create_titled(client: &Client, token: &str, title: &str) -> i64 {
        let response = create_todo(client, token, json!({ "title": title }));
        assert_eq!(response.status(), Status::Created);
        response.into_json::<Envelope<Todo>>().unwrap().resource_id.unwrap()
    }

    fn message(response: LocalResponse<'_>) -> String {
        response.into_json::<Envelope<()>>().unwrap().message.unwrap_or_default()
    }

    #[test]
    fn test_ping() {
        let client = test_client();
        let response = client.get("/ping").dispatch();
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(message(response), "pong");
    }

    // --- Registration and login ---

    #[test]
    fn test_register_user_success() {
        let client = test_client();
        let email = unique_email("register");
        let response = client
            .post("/api/v1/user/register")
            .header(ContentType::JSON)
            .body(json!({ "email": email, "password": "pw", "firstName": "Bob", "lastName": "Smith" }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::Created);

        let set_cookie = response.headers().get_one("Set-Cookie").unwrap().to_string();
        assert!(set_cookie.starts_with("token="));
        assert!(set_cookie.contains("HttpOnly"));
        assert!(set_cookie.contains("Max-Age=604800"));
        assert!(!set_cookie.contains("Secure"));

        let body = response.into_json::<Envelope<()>>().unwrap();
        assert_eq!(body.status, 201);
        assert_eq!(body.email.as_deref(), Some(email.as_str()));
        assert!(body.resource_id.is_some());
        let token = body.token.unwrap();
        assert!(set_cookie.contains(&token));
        assert_eq!(tokens().verify(&token).unwrap(), body.resource_id.unwrap());
    }

    #[test]
    fn test_register_rejects_bad_bodies() {
        let client = test_client();
        let bodies = [
            json!({}),
            json!({ "some": "field" }),
            json!({ "email": unique_email("bad"), "password": "pw", "firstName": "", "lastName": "Smith" }),
            json!({ "email": "not-an-email", "password": "pw", "firstName": "Bob", "lastName": "Smith" }),
        ];
        for body in bodies {
            let response = client
                .post("/api/v1/user/register")
                .header(ContentType::JSON)
                .body(body.to_string())
                .dispatch();
            assert_eq!(response.status(), Status::BadRequest, "body: {}", body);
        }

        let response = client
            .post("/api/v1/user/register")
            .header(ContentType::JSON)
            .body("{not json")
            .dispatch();
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[test]
    fn test_register_user_conflict() {
        let client = test_client();
        let email = unique_email("conflict");
        register(&client, &email, "password123");

        let response = client
            .post("/api/v1/user/register")
            .header(ContentType::JSON)
            .body(json!({ "email": email, "password": "other", "firstName": "Al", "lastName": "Jones" }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::Conflict);
    }

    #[test]
    fn test_login_user_success() {
        let client = test_client();
        let email = unique_email("login");
        let (user_id, _) = register(&client, &email, "pw");

        let response = client
            .post("/api/v1/user/login")
            .header(ContentType::JSON)
            .body(json!({ "email": email, "password": "pw" }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::Ok, "Login failed");
        assert!(response.headers().get_one("Set-Cookie").unwrap().starts_with("token="));

        let body = response.into_json::<Envelope<()>>().unwrap();
        assert_eq!(body.resource_id, Some(user_id));
        let token = body.token.unwrap();

        // The issued token gets through the authorization guard.
        let todo_id = create_titled(&client, &token, "after login");
        assert!(todo_id > 0);
    }

    #[test]
    fn test_login_user_wrong_password() {
        let client = test_client();
        let email = unique_email("wrongpass");
        register(&client, &email, "pw");

        let response = client
            .post("/api/v1/user/login")
            .header(ContentType::JSON)
            .body(json!({ "email": email, "password": "wrong" }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::Unauthorized);
        assert!(response.headers().get_one("Set-Cookie").is_none());
    }

    #[test]
    fn test_login_user_not_found() {
        let client = test_client();
        let response = client
            .post("/api/v1/user/login")
            .header(ContentType::JSON)
            .body(json!({ "email": "nobody@example.com", "password": "password" }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::NotFound);
    }

    #[test]
    fn test_login_requires_both_fields() {
        let client = test_client();
        for body in [json!({}), json!({ "email": "field" }), json!({ "email": "a@b.com", "password": "" })] {
            let response = client
                .post("/api/v1/user/login")
                .header(ContentType::JSON)
                .body(body.to_string())
                .dispatch();
            assert_eq!(response.status(), Status::BadRequest, "body: {}", body);
        }
    }

    // --- Authorization guard ---

    #[test]
    fn test_missing_credentials_unauthorized() {
        let client = test_client();
        let response = client.get("/api/v1/todos").dispatch();
        assert_eq!(response.status(), Status::Unauthorized);
        assert_eq!(
            message(response),
            "Authorized routes require cookie token or Authorization header"
        );
    }

    #[test]
    fn test_malformed_header_bad_request() {
        let client = test_client();
        for value in ["Bearer", "Bearer a b", "Token abc"] {
            let response = client
                .get("/api/v1/todos")
                .header(Header::new("Authorization", value))
                .dispatch();
            assert_eq!(response.status(), Status::BadRequest, "header: {}", value);
        }
    }

    #[test]
    fn test_foreign_signature_unauthorized() {
        let client = test_client();
        let forged = TokenService::new("some other secret", Duration::days(7))
            .issue_session(1)
            .unwrap();
        let response = client.get("/api/v1/todos").header(bearer(&forged)).dispatch();
        assert_eq!(response.status(), Status::Unauthorized);
        assert_eq!(message(response), "Invalid token");
    }

    #[test]
    fn test_expired_token_unauthorized() {
        let client = test_client();
        let (user_id, _) = new_user(&client, "expired");
        let expired = tokens().issue(user_id, Utc::now() - Duration::hours(1)).unwrap();
        let response = client.get("/api/v1/todos").header(bearer(&expired)).dispatch();
        assert_eq!(response.status(), Status::Unauthorized);
        assert_eq!(message(response), "Invalid token");
    }

    #[test]
    fn test_unparseable_token_bad_request() {
        let client = test_client();
        let response = client.get("/api/v1/todos").header(bearer("garbage")).dispatch();
        assert_eq!(response.status(), Status::BadRequest);
        assert_eq!(message(response), "Unable to parse token");
    }

    #[test]
    fn test_cookie_token_accepted() {
        let client = test_client();
        let (_, token) = new_user(&client, "cookie");
        let response = client
            .post("/api/v1/todos")
            .header(ContentType::JSON)
            .cookie(Cookie::new("token", token))
            .body(json!({ "note": "via cookie" }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::Created);
    }

    #[get("/whoami")]
    fn whoami(user: CurrentUser) -> String {
        user.0.to_string()
    }

    #[test]
    fn test_identity_without_guard_is_internal_error() {
        let rocket = todo_api::rocket_instance(test_state(), "1").mount("/probe", routes![whoami]);
        let client = Client::untracked(rocket).expect("valid rocket instance");
        let response = client.get("/probe/whoami").dispatch();
        assert_eq!(response.status(), Status::InternalServerError);
        assert_eq!(message(response), "Missing authenticated user");
    }

    // --- Todos ---

    #[test]
    fn test_create_todo_validation() {
        let client = test_client();
        let (_, token) = new_user(&client, "create");

        for body in [json!({ "title": "", "note": "" }), json!({}), json!({ "some": "field" })] {
            let response = create_todo(&client, &token, body.clone());
            assert_eq!(response.status(), Status::BadRequest, "body: {}", body);
        }

        let response = create_todo(&client, &token, json!({ "title": "asd", "note": "" }));
        assert_eq!(response.status(), Status::Created);

        let response = create_todo(&client, &token, json!({ "title": "test title", "note": "test note" }));
        assert_eq!(response.status(), Status::Created);
        let body = response.into_json::<Envelope<Todo>>().unwrap();
        let todo = body.data.unwrap();
        assert_eq!(body.resource_id, Some(todo.id));
        assert_eq!(todo.title.as_deref(), Some("test title"));
        assert_eq!(todo.note.as_deref(), Some("test note"));
        assert!(!todo.is_done);
        assert!(todo.completed_at.is_none());
    }

    #[test]
    fn test_create_with_trailing_slash() {
        let client = test_client();
        let (_, token) = new_user(&client, "slash");
        let response = client
            .post("/api/v1/todos/")
            .header(ContentType::JSON)
            .header(bearer(&token))
            .body(json!({ "title": "slashed" }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::Created);

        let response = client.get("/api/v1/todos/").header(bearer(&token)).dispatch();
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_json::<Envelope<Vec<Todo>>>().unwrap().data.unwrap().len(), 1);
    }

    #[test]
    fn test_get_todo() {
        let client = test_client();
        let (_, token) = new_user(&client, "get");
        let todo_id = create_titled(&client, &token, "buy milk");

        let response = client
            .get(format!("/api/v1/todos/{}", todo_id))
            .header(bearer(&token))
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        let todo = response.into_json::<Envelope<Todo>>().unwrap().data.unwrap();
        assert_eq!(todo.id, todo_id);
        assert_eq!(todo.title.as_deref(), Some("buy milk"));
        assert!(todo.note.is_none());

        let response = client.get("/api/v1/todos/999999").header(bearer(&token)).dispatch();
        assert_eq!(response.status(), Status::NotFound);

        let response = client.get("/api/v1/todos/abc").header(bearer(&token)).dispatch();
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[test]
    fn test_todo_hidden_from_other_users() {
        let client = test_client();
        let (_, owner) = new_user(&client, "owner");
        let (_, intruder) = new_user(&client, "intruder");
        let todo_id = create_titled(&client, &owner, "private");
        let uri = format!("/api/v1/todos/{}", todo_id);

        let response = client.get(uri.as_str()).header(bearer(&intruder)).dispatch();
        assert_eq!(response.status(), Status::NotFound);

        let response = client
            .put(uri.as_str())
            .header(ContentType::JSON)
            .header(bearer(&intruder))
            .body(json!({ "title": "hijacked" }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::NotFound);

        let response = client
            .get(format!("{}/completed", uri))
            .header(bearer(&intruder))
            .dispatch();
        assert_eq!(response.status(), Status::NotFound);

        let response = client.delete(uri.as_str()).header(bearer(&intruder)).dispatch();
        assert_eq!(response.status(), Status::NotFound);

        let response = client.get("/api/v1/todos").header(bearer(&intruder)).dispatch();
        assert_eq!(response.status(), Status::NotFound);

        // Owner's copy is untouched.
        let response = client.get(uri.as_str()).header(bearer(&owner)).dispatch();
        assert_eq!(response.status(), Status::Ok);
        let todo = response.into_json::<Envelope<Todo>>().unwrap().data.unwrap();
        assert_eq!(todo.title.as_deref(), Some("private"));
        assert!(!todo.is_done);
    }

    #[test]
    fn test_list_empty_is_not_found() {
        let client = test_client();
        let (_, token) = new_user(&client, "empty");
        let response = client.get("/api/v1/todos").header(bearer(&token)).dispatch();
        assert_eq!(response.status(), Status::NotFound);
        assert_eq!(message(response), "No todo items");
    }

    #[test]
    fn test_list_pages_by_cursor() {
        let client = test_client();
        let (_, token) = new_user(&client, "pages");
        let (_, other) = new_user(&client, "pages_other");
        let mut mine = Vec::new();
        for i in 0..23 {
            mine.push(create_titled(&client, &token, &format!("todo {}", i)));
            if i % 5 == 0 {
                create_titled(&client, &other, "not mine");
            }
        }

        let mut seen: Vec<i64> = Vec::new();
        let mut prev = 0;
        let mut pages = 0;
        loop {
            let response = client
                .get(format!("/api/v1/todos?prev={}", prev))
                .header(bearer(&token))
                .dispatch();
            if response.status() == Status::NotFound {
                break;
            }
            assert_eq!(response.status(), Status::Ok);
            let page = response.into_json::<Envelope<Vec<Todo>>>().unwrap().data.unwrap();
            assert!(!page.is_empty() && page.len() <= 10);
            for todo in &page {
                assert!(mine.contains(&todo.id), "todo {} belongs to another user", todo.id);
                assert!(todo.id > prev);
                assert!(!seen.contains(&todo.id), "todo {} returned twice", todo.id);
                seen.push(todo.id);
            }
            prev = page.last().unwrap().id;
            pages += 1;
        }
        assert_eq!(seen, mine);
        assert_eq!(pages, 3);

        let response = client.get("/api/v1/todos?prev=abc").header(bearer(&token)).dispatch();
        assert_eq!(response.status(), Status::BadRequest);
    }

    #[test]
    fn test_update_todo() {
        let client = test_client();
        let (_, token) = new_user(&client, "update");
        let response = create_todo(&client, &token, json!({ "title": "old title", "note": "keep me" }));
        let created = response.into_json::<Envelope<Todo>>().unwrap().data.unwrap();
        let uri = format!("/api/v1/todos/{}", created.id);

        let response = client
            .put(uri.as_str())
            .header(ContentType::JSON)
            .header(bearer(&token))
            .body(json!({}).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::BadRequest);

        let response = client
            .put(uri.as_str())
            .header(ContentType::JSON)
            .header(bearer(&token))
            .body(json!({ "title": "new title" }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::Ok);
        let body = response.into_json::<Envelope<Todo>>().unwrap();
        assert_eq!(body.resource_id, Some(created.id));
        let updated = body.data.unwrap();
        assert_eq!(updated.title.as_deref(), Some("new title"));
        assert_eq!(updated.note.as_deref(), Some("keep me"));
        assert!(updated.modified_at >= created.modified_at);

        let response = client
            .put("/api/v1/todos/999999")
            .header(ContentType::JSON)
            .header(bearer(&token))
            .body(json!({ "title": "ghost" }).to_string())
            .dispatch();
        assert_eq!(response.status(), Status::NotFound);
    }

    #[test]
    fn test_complete_todo() {
        let client = test_client();
        let (_, token) = new_user(&client, "complete");
        let todo_id = create_titled(&client, &token, "finish me");
        let uri = format!("/api/v1/todos/{}/completed", todo_id);

        let response = client.get(uri.as_str()).header(bearer(&token)).dispatch();
        assert_eq!(response.status(), Status::Ok);
        let first = {
            let response = client
                .get(format!("/api/v1/todos/{}", todo_id))
                .header(bearer(&token))
                .dispatch();
            response.into_json::<Envelope<Todo>>().unwrap().data.unwrap()
        };
        assert!(first.is_done);
        let first_completed = first.completed_at.unwrap();

        // Completing again still succeeds and moves the timestamp forward.
        let response = client.get(uri.as_str()).header(bearer(&token)).dispatch();
        assert_eq!(response.status(), Status::Ok);
        assert_eq!(response.into_json::<Envelope<()>>().unwrap().resource_id, Some(todo_id));

        let response = client
            .get(format!("/api/v1/todos/{}", todo_id))
            .header(bearer(&token))
            .dispatch();
        let second = response.into_json::<Envelope<Todo>>().unwrap().data.unwrap();
        assert!(second.is_done);
        assert!(second.completed_at.unwrap() >= first_completed);

        let response = client
            .get("/api/v1/todos/999999/completed")
            .header(bearer(&token))
            .dispatch();
        assert_eq!(response.status(), Status::NotFound);
    }

    #[test]
    fn test_delete_todo() {
        let client = test_client();
        let (_, token) = new_user(&client, "delete");
        let todo_id = create_titled(&client, &token, "delete me");
        let uri = format!("/api/v1/todos/{}", todo_id);

        let response = client.delete(uri.as_str()).header(bearer(&token)).dispatch();
        assert_eq!(response.status(), Status::Ok);
        let body = response.into_json::<Envelope<()>>().unwrap();
        assert_eq!(body.resource_id, Some(todo_id));
        assert_eq!(body.message.as_deref(), Some("Todo deleted successfully!"));

        let response = client.get(uri.as_str()).header(bearer(&token)).dispatch();
        assert_eq!(response.status(), Status::NotFound);

        let response = client.delete(uri.as_str()).header(bearer(&token)).dispatch();
        assert_eq!(response.status(), Status::NotFound);
    }

    #[test]
    fn test_serialized_todo_omits_unset_fields() {
        let client = test_client();
        let (_, token) = new_user(&client, "serialize");
        let todo_id = create_titled(&client, &token, "only a title");

        let response = client
            .get(format!("/api/v1/todos/{}", todo_id))
            .header(bearer(&token))
            .dispatch();
        let body: serde_json::Value = serde_json::from_str(&response.into_string().unwrap()).unwrap();
        let data = body["data"].as_object().unwrap();
        assert_eq!(data["title"], "only a title");
        assert_eq!(data["isDone"], false);
        assert!(data.contains_key("createdAt"));
        assert!(data.contains_key("modifiedAt"));
        assert!(!data.contains_key("note"));
        assert!(!data.contains_key("userId"));
        assert!(!data.contains_key("dueAt"));
        assert!(!data.contains_key("completedAt"));
    }
}
