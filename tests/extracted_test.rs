use eml_extract::*;

#[test]
fn test_read_simple_message() {
    let raw = "From: John Doe <john@example.com>\r\n\
               To: recipient@example.com\r\n\
               Subject: Test Email\r\n\
               Date: Wed, 01 Jan 2025 12:00:00 +0000\r\n\
               Content-Type: text/plain\r\n\
               \r\n\
               Hello, this is a test email.";

    let email = read(raw, &ParseOptions::default()).unwrap();

    assert_eq!(email.subject.as_deref(), Some("Test Email"));
    assert_eq!(email.text.as_deref(), Some("Hello, this is a test email."));
    assert_eq!(email.date.unwrap().to_rfc3339(), "2025-01-01T12:00:00+00:00");
    assert!(email.attachments.is_empty());

    let from = email.from.unwrap();
    assert_eq!(from.len(), 1);
    let sender = from.first().unwrap();
    assert_eq!(sender.name.as_deref(), Some("John Doe"));
    assert_eq!(sender.email.as_deref(), Some("john@example.com"));
}

#[test]
fn test_read_body_without_content_type_is_text() {
    let raw = "From: sender@example.com\r\n\
               \r\n\
               Whole body here";

    let email = read(raw, &ParseOptions::default()).unwrap();

    assert_eq!(email.text.as_deref(), Some("Whole body here"));
    assert!(email.html.is_none());
    assert!(email.attachments.is_empty());
}

#[test]
fn test_read_single_part_with_content_type() {
    let raw = "Content-Type: text/plain\r\n\
               \r\n\
               Hello";

    let email = read(raw, &ParseOptions::default()).unwrap();

    assert_eq!(email.text.as_deref(), Some("Hello"));
    assert_eq!(email.headers.get("Content-Type"), Some("text/plain"));
    assert_eq!(email.headers.len(), 1);
}

#[test]
fn test_read_from_with_two_addresses_is_a_list() {
    let raw = "From: \"A\" <a@x.com>, \"B\" <b@x.com>\r\n\
               Subject: s\r\n\
               \r\n\
               x";

    let email = read(raw, &ParseOptions::default()).unwrap();

    match email.from.unwrap() {
        AddressField::List(list) => {
            assert_eq!(list.len(), 2);
            assert_eq!(list[0].name.as_deref(), Some("A"));
            assert_eq!(list[0].email.as_deref(), Some("a@x.com"));
            assert_eq!(list[1].name.as_deref(), Some("B"));
            assert_eq!(list[1].email.as_deref(), Some("b@x.com"));
        }
        AddressField::Single(_) => panic!("two addresses must become a list"),
    }
}

#[test]
fn test_read_single_address_stays_scalar() {
    let raw = "From: solo@example.com\r\n\
               \r\n\
               x";

    let email = read(raw, &ParseOptions::default()).unwrap();

    match email.from.unwrap() {
        AddressField::Single(address) => {
            assert_eq!(address.email.as_deref(), Some("solo@example.com"));
            assert!(address.name.is_none());
        }
        AddressField::List(_) => panic!("one address must stay scalar"),
    }
}

#[test]
fn test_read_cc_list() {
    let raw = "From: a@example.com\r\n\
               Cc: one@example.com, two@example.com\r\n\
               \r\n\
               x";

    let email = read(raw, &ParseOptions::default()).unwrap();

    let cc = email.cc.unwrap();
    assert_eq!(cc.len(), 2);
}

#[test]
fn test_read_multipart_with_attachment() {
    let raw = "From: a@example.com\r\n\
               Content-Type: multipart/mixed; boundary=\"MIX\"\r\n\
               \r\n\
               --MIX\r\n\
               Content-Type: text/plain\r\n\
               \r\n\
               Body text\r\n\
               --MIX\r\n\
               Content-Type: application/pdf\r\n\
               Content-Disposition: attachment; filename=\"report.pdf\"; size=10\r\n\
               Content-Transfer-Encoding: base64\r\n\
               \r\n\
               SGVsbG8gd29ybGQ=\r\n\
               --MIX--\r\n";

    let email = read(raw, &ParseOptions::default()).unwrap();

    assert_eq!(email.text.as_deref(), Some("Body text"));
    assert_eq!(email.attachments.len(), 1);

    let attachment = &email.attachments[0];
    assert_eq!(attachment.name.as_deref(), Some("report.pdf"));
    assert_eq!(attachment.content_type.as_deref(), Some("application/pdf"));
    assert_eq!(attachment.size, 10);
    assert!(!attachment.inline);
    assert_eq!(attachment.content.as_bytes(), b"Hello world");
}

#[test]
fn test_read_folded_multipart_content_type() {
    let raw = "From: a@example.com\r\n\
               Subject: folded declaration\r\n\
               Content-Type: multipart/mixed;\r\n\
               \tboundary=\"SEG\"\r\n\
               \r\n\
               --SEG\r\n\
               Content-Type: text/plain\r\n\
               \r\n\
               Body survives folding\r\n\
               --SEG--\r\n";

    let email = read(raw, &ParseOptions::default()).unwrap();

    assert_eq!(email.subject.as_deref(), Some("folded declaration"));
    assert_eq!(email.text.as_deref(), Some("Body survives folding"));
}

#[test]
fn test_read_inline_attachment_with_content_id() {
    let raw = "From: a@example.com\r\n\
               Content-Type: multipart/related; boundary=REL\r\n\
               \r\n\
               --REL\r\n\
               Content-Type: text/html\r\n\
               \r\n\
               <img src=\"cid:img001@local\">\r\n\
               --REL\r\n\
               Content-Type: image/png\r\n\
               Content-Disposition: inline; filename=logo.png\r\n\
               Content-ID: <img001@local>\r\n\
               Content-Transfer-Encoding: base64\r\n\
               \r\n\
               iVBORw0=\r\n\
               --REL--\r\n";

    let email = read(raw, &ParseOptions::default()).unwrap();

    assert_eq!(email.attachments.len(), 1);
    let attachment = &email.attachments[0];
    assert!(attachment.inline);
    assert_eq!(attachment.content_id.as_deref(), Some("img001@local"));
    assert_eq!(attachment.name.as_deref(), Some("logo.png"));
    assert!(email.html.is_some());
}

#[test]
fn test_read_multipart_alternative_merged_into_flat_result() {
    let raw = "From: a@example.com\r\n\
               Content-Type: multipart/mixed; boundary=OUTER\r\n\
               \r\n\
               --OUTER\r\n\
               Content-Type: multipart/alternative; boundary=INNER\r\n\
               \r\n\
               --INNER\r\n\
               Content-Type: text/plain\r\n\
               \r\n\
               plain version\r\n\
               --INNER\r\n\
               Content-Type: text/html\r\n\
               \r\n\
               <p>html version</p>\r\n\
               --INNER--\r\n\
               --OUTER--\r\n";

    let email = read(raw, &ParseOptions::default()).unwrap();

    assert_eq!(email.text.as_deref(), Some("plain version"));
    assert_eq!(email.html.as_deref(), Some("<p>html version</p>"));

    let alternative = email.multipart_alternative.unwrap();
    assert!(alternative.content_type.starts_with("multipart/alternative"));

    assert_eq!(
        email.html_headers.unwrap().get("Content-Type"),
        Some("text/html")
    );
    assert_eq!(
        email.text_headers.unwrap().get("Content-Type"),
        Some("text/plain")
    );
}

#[test]
fn test_read_every_terminal_part_is_dispatched() {
    // four terminal parts: two text, one html, one attachment
    let raw = "From: a@example.com\r\n\
               Content-Type: multipart/mixed; boundary=M\r\n\
               \r\n\
               --M\r\n\
               Content-Type: text/plain\r\n\
               \r\n\
               alpha\r\n\
               --M\r\n\
               Content-Type: text/plain\r\n\
               X-Rank: 2\r\n\
               \r\n\
               beta\r\n\
               --M\r\n\
               Content-Type: text/html\r\n\
               \r\n\
               <i>gamma</i>\r\n\
               --M\r\n\
               Content-Type: image/png\r\n\
               Content-Disposition: attachment; filename=p.png\r\n\
               \r\n\
               notreallyapng\r\n\
               --M--\r\n";

    let email = read(raw, &ParseOptions::default()).unwrap();

    assert_eq!(email.text.as_deref(), Some("alphabeta"));
    assert_eq!(email.html.as_deref(), Some("<i>gamma</i>"));
    assert_eq!(email.attachments.len(), 1);
    // headers of the last text part win
    assert_eq!(email.text_headers.unwrap().get("X-Rank"), Some("2"));
}

#[test]
fn test_read_html_line_breaks_and_escaped_quotes_cleaned() {
    let raw = "From: a@example.com\r\n\
               Content-Type: text/html\r\n\
               \r\n\
               <p>one</p>\r\n\
               <p>two \\\"quoted\\\"</p>";

    let email = read(raw, &ParseOptions::default()).unwrap();

    assert_eq!(
        email.html.as_deref(),
        Some("<p>one</p><p>two \"quoted\"</p>")
    );
}

#[test]
fn test_read_double_base64_html_requires_opt_in() {
    // "PGI+SGk8L2I+" is "<b>Hi</b>" encoded once
    let raw = "From: a@example.com\r\n\
               Content-Type: text/html\r\n\
               \r\n\
               PGI+SGk8L2I+";

    let default_email = read(raw, &ParseOptions::default()).unwrap();
    assert_eq!(default_email.html.as_deref(), Some("PGI+SGk8L2I+"));

    let options = ParseOptions {
        unwrap_double_base64: true,
        ..ParseOptions::default()
    };
    let unwrapped = read(raw, &options).unwrap();
    assert_eq!(unwrapped.html.as_deref(), Some("<b>Hi</b>"));
}

#[test]
fn test_read_quoted_printable_body() {
    let raw = "From: a@example.com\r\n\
               Content-Type: text/plain; charset=utf-8\r\n\
               Content-Transfer-Encoding: quoted-printable\r\n\
               \r\n\
               Caf=C3=A9 au=\r\n\
               =20lait";

    let email = read(raw, &ParseOptions::default()).unwrap();

    assert_eq!(email.text.as_deref(), Some("Café au lait"));
}

#[test]
fn test_read_base64_gb2312_text_body() {
    let raw = "From: a@example.com\r\n\
               Content-Type: text/plain; charset=\"gb2312\"\r\n\
               Content-Transfer-Encoding: base64\r\n\
               \r\n\
               xOO6ww==";

    let email = read(raw, &ParseOptions::default()).unwrap();

    assert_eq!(email.text.as_deref(), Some("你好"));
}

#[test]
fn test_read_encoded_word_subject() {
    let raw = "From: a@example.com\r\n\
               Subject: =?UTF-8?B?SGVsbG8gV29ybGQ=?=\r\n\
               \r\n\
               x";

    let email = read(raw, &ParseOptions::default()).unwrap();

    assert_eq!(email.subject.as_deref(), Some("Hello World"));
}

#[test]
fn test_read_q_encoded_latin1_subject() {
    let raw = "From: a@example.com\r\n\
               Subject: =?iso-8859-1?Q?caf=E9_con_leche?=\r\n\
               \r\n\
               x";

    let email = read(raw, &ParseOptions::default()).unwrap();

    assert_eq!(email.subject.as_deref(), Some("café con leche"));
}

#[test]
fn test_read_unparsable_date_left_unset() {
    let raw = "From: a@example.com\r\n\
               Date: not a date at all\r\n\
               \r\n\
               x";

    let email = read(raw, &ParseOptions::default()).unwrap();

    assert!(email.date.is_none());
    assert_eq!(email.headers.get("Date"), Some("not a date at all"));
}

#[test]
fn test_read_headers_only_gives_header_only_result() {
    let raw = "From: a@example.com\r\n\
               Subject: headers only\r\n\
               Content-Type: multipart/mixed; boundary=HO\r\n\
               \r\n\
               --HO\r\n\
               Content-Type: text/plain\r\n\
               \r\n\
               never read\r\n\
               --HO--\r\n";

    let options = ParseOptions {
        headers_only: true,
        ..ParseOptions::default()
    };
    let email = read(raw, &options).unwrap();

    assert_eq!(email.subject.as_deref(), Some("headers only"));
    assert!(email.text.is_none());
    assert!(email.html.is_none());
    assert!(email.attachments.is_empty());
}

#[test]
fn test_read_accepts_parsed_tree() {
    let raw = "From: a@example.com\r\n\
               Subject: via tree\r\n\
               \r\n\
               tree body";

    let options = ParseOptions::default();
    let tree = parse(raw, &options).unwrap();
    let email = read(&tree, &options).unwrap();

    assert_eq!(email.subject.as_deref(), Some("via tree"));
    assert_eq!(email.text.as_deref(), Some("tree body"));
}

#[test]
fn test_read_structure_without_headers() {
    let raw = "no headers in sight\r\n\
               second line";

    let err = read(raw, &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, EmlError::MissingHeaders));
}

#[test]
fn test_read_empty_input() {
    let err = read("", &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, EmlError::InvalidInput(_)));
}

#[test]
fn test_read_malformed_boundary_propagates() {
    let raw = "Content-Type: multipart/mixed\r\n\
               \r\n\
               body";

    let err = read(raw, &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, EmlError::MalformedBoundaryMarker(_)));
}

#[test]
fn test_read_deeply_nested_part_kept_as_raw_data() {
    let raw = "From: a@example.com\r\n\
               Content-Type: multipart/mixed; boundary=L1\r\n\
               \r\n\
               --L1\r\n\
               Content-Type: multipart/alternative; boundary=L2\r\n\
               \r\n\
               --L2\r\n\
               Content-Type: multipart/related; boundary=L3\r\n\
               \r\n\
               --L3\r\n\
               Content-Type: text/plain\r\n\
               \r\n\
               deep content\r\n\
               --L3--\r\n\
               --L2--\r\n\
               --L1--\r\n";

    let email = read(raw, &ParseOptions::default()).unwrap();

    assert_eq!(email.data.as_deref(), Some("deep content"));
    assert!(email.text.is_none());
}

#[test]
fn test_read_verbose_flag_does_not_change_result() {
    let raw = "From: a@example.com\r\n\
               Content-Type: multipart/mixed; boundary=V\r\n\
               \r\n\
               --V\r\n\
               Content-Type: text/plain\r\n\
               \r\n\
               quiet or chatty\r\n\
               --V--\r\n";

    let quiet = read(raw, &ParseOptions::default()).unwrap();
    let options = ParseOptions {
        verbose: true,
        ..ParseOptions::default()
    };
    let chatty = read(raw, &options).unwrap();

    assert_eq!(quiet, chatty);
}

#[test]
fn test_read_with_callback_observes_success() {
    let raw = "From: a@example.com\r\n\
               \r\n\
               x";

    let mut observed = None;
    let outcome = read_with(raw, &ParseOptions::default(), |result| {
        observed = Some(result.is_ok());
    });

    assert_eq!(observed, Some(true));
    assert!(outcome.is_ok());
}

#[test]
fn test_read_with_callback_observes_error() {
    let mut observed = None;
    let outcome = read_with("", &ParseOptions::default(), |result| {
        observed = Some(result.is_err());
    });

    assert_eq!(observed, Some(true));
    assert!(outcome.is_err());
}
