use catalog::command::ROW_SEPARATOR;
use catalog::{Movie, ProtocolError, Reply, Request, Response, Status, Summary};

#[test]
fn parses_every_opcode() {
    assert_eq!(
        Request::parse("1|Dune|Sci-Fi|Denis Villeneuve|2021").unwrap(),
        Request::Create {
            title: "Dune".to_string(),
            genre: "Sci-Fi".to_string(),
            director: "Denis Villeneuve".to_string(),
            year: "2021".to_string(),
        }
    );
    assert_eq!(
        Request::parse("2|687616|Adventure").unwrap(),
        Request::UpdateGenre {
            key: 687616,
            genre: "Adventure".to_string()
        }
    );
    assert_eq!(Request::parse("3|5").unwrap(), Request::Delete { key: 5 });
    assert_eq!(Request::parse("4").unwrap(), Request::ListSummaries);
    assert_eq!(Request::parse("5").unwrap(), Request::ListAll);
    assert_eq!(Request::parse("6|-12").unwrap(), Request::Get { key: -12 });
    assert_eq!(
        Request::parse("7|Film Noir").unwrap(),
        Request::ListByGenre {
            genre: "Film Noir".to_string()
        }
    );
}

#[test]
fn operands_are_kept_verbatim() {
    assert_eq!(
        Request::parse("7| Drama ").unwrap(),
        Request::ListByGenre {
            genre: " Drama ".to_string()
        }
    );
}

#[test]
fn rejects_unknown_opcodes() {
    assert_eq!(
        Request::parse("9").unwrap_err(),
        ProtocolError::UnknownOpcode("9".to_string())
    );
    assert_eq!(
        Request::parse("0|x").unwrap_err(),
        ProtocolError::UnknownOpcode("0".to_string())
    );
    assert_eq!(
        Request::parse("44").unwrap_err(),
        ProtocolError::UnknownOpcode("44".to_string())
    );
    assert_eq!(
        Request::parse("|4").unwrap_err(),
        ProtocolError::UnknownOpcode("".to_string())
    );
    assert_eq!(Request::parse("").unwrap_err(), ProtocolError::Empty);
}

#[test]
fn operand_count_must_match_exactly() {
    assert_eq!(
        Request::parse("1|Dune|Sci-Fi|Denis Villeneuve").unwrap_err(),
        ProtocolError::Arity {
            opcode: 1,
            expected: 4,
            actual: 3
        }
    );
    // an operand containing the delimiter looks like an extra operand
    assert_eq!(
        Request::parse("1|Dune|Part|Two|Sci-Fi|Denis Villeneuve|2024").unwrap_err(),
        ProtocolError::Arity {
            opcode: 1,
            expected: 4,
            actual: 6
        }
    );
    assert_eq!(
        Request::parse("4|").unwrap_err(),
        ProtocolError::Arity {
            opcode: 4,
            expected: 0,
            actual: 1
        }
    );
    assert_eq!(
        Request::parse("6").unwrap_err(),
        ProtocolError::Arity {
            opcode: 6,
            expected: 1,
            actual: 0
        }
    );
}

#[test]
fn non_numeric_ids_are_protocol_errors() {
    assert_eq!(
        Request::parse("6|abc").unwrap_err(),
        ProtocolError::InvalidId("abc".to_string())
    );
    assert_eq!(
        Request::parse("3|").unwrap_err(),
        ProtocolError::InvalidId("".to_string())
    );
    assert_eq!(
        Request::parse("2|1.5|Drama").unwrap_err(),
        ProtocolError::InvalidId("1.5".to_string())
    );
}

#[test]
fn empty_text_operands_are_rejected() {
    assert_eq!(
        Request::parse("1|Dune||Denis Villeneuve|2021").unwrap_err(),
        ProtocolError::EmptyField("genre")
    );
    assert_eq!(
        Request::parse("7|").unwrap_err(),
        ProtocolError::EmptyField("genre")
    );
}

#[test]
fn encoding_refuses_reserved_characters() {
    let request = Request::Create {
        title: "Face|Off".to_string(),
        genre: "Action".to_string(),
        director: "John Woo".to_string(),
        year: "1997".to_string(),
    };
    assert_eq!(
        request.encode().unwrap_err(),
        ProtocolError::ReservedCharacter("title")
    );

    let request = Request::ListByGenre {
        genre: "Drama\n4".to_string(),
    };
    assert!(request.encode().is_err());
}

#[test]
fn encoded_requests_parse_back() {
    let request = Request::UpdateGenre {
        key: 687616,
        genre: "Adventure".to_string(),
    };
    assert_eq!(request.encode().unwrap(), "2|687616|Adventure");
    assert_eq!(Request::parse(&request.encode().unwrap()).unwrap(), request);
    assert_eq!(Request::ListAll.encode().unwrap(), "5");
}

#[test]
fn responses_lead_with_a_status_token() {
    assert_eq!(Response::Created(687616).encode(), "OK created 687616");
    assert_eq!(
        Response::Duplicate(687616).encode(),
        "DUPLICATE record already exists with id 687616"
    );
    assert_eq!(Response::KeyNotFound(7).encode(), "NOT_FOUND no movie with id 7");
    assert_eq!(
        Response::GenreNotFound("Western".to_string()).encode(),
        "NOT_FOUND no movies with genre \"Western\""
    );
    assert_eq!(
        Response::Protocol(ProtocolError::UnknownOpcode("9".to_string())).encode(),
        "ERROR unknown operation '9'"
    );
    assert!(Response::Failure("create failed: disk full".to_string())
        .encode()
        .starts_with("FAIL "));
}

#[test]
fn listings_stay_on_one_line() {
    let movies = vec![
        Movie::new(1, "Heat", "Crime", "Michael Mann", "1995"),
        Movie::new(2, "Line\nBreak", "Drama", "Some\u{1e}One", "2000"),
    ];
    let line = Response::Movies(movies).encode();
    assert!(!line.contains('\n'));

    let rows: Vec<&str> = line.split(ROW_SEPARATOR).collect();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0], "OK 2 record(s)");
    assert_eq!(
        rows[1],
        "ID: 1 | Title: Heat | Genre: Crime | Director: Michael Mann | Year: 1995"
    );
    assert_eq!(
        rows[2],
        "ID: 2 | Title: Line Break | Genre: Drama | Director: Some One | Year: 2000"
    );
}

#[test]
fn empty_listing_says_so() {
    assert_eq!(Response::Summaries(vec![]).encode(), "OK catalog is empty");
    assert_eq!(Response::Movies(vec![]).encode(), "OK catalog is empty");
}

#[test]
fn replies_parse_status_message_and_rows() {
    let line = Response::Summaries(vec![
        Summary {
            key: 3,
            title: "Heat".to_string(),
        },
        Summary {
            key: 9,
            title: "Ran".to_string(),
        },
    ])
    .encode();
    let reply = Reply::parse(&line).unwrap();
    assert_eq!(reply.status, Status::Ok);
    assert_eq!(reply.message, "2 record(s)");
    assert_eq!(reply.rows, vec!["ID: 3 | Title: Heat", "ID: 9 | Title: Ran"]);
    assert!(reply.is_ok());

    let reply = Reply::parse("NOT_FOUND no movie with id 7").unwrap();
    assert_eq!(reply.status, Status::NotFound);
    assert!(reply.rows.is_empty());

    assert!(Reply::parse("Filme adicionado").is_err());
}
