//! End-to-end transformations of Java units with the built-in rules.

mod common;

use common::{fix, transform};
use cwefix::{DiagnosticKind, TransformState};
use indoc::indoc;
use pretty_assertions::assert_eq;

const LANG2_UTILITY: &str = indoc! {"
    package au.com.suncorp.easyshare.services.util;
    import org.apache.commons.lang.RandomStringUtils;
    public final class RandomUtil {
        private RandomUtil() {
        }
        public static String generateString(int count) {
            return RandomStringUtils.randomAlphanumeric(count);
        }
    }
"};

const LANG3_KEYS: &str = indoc! {"
    package io.moderne.service.util;

    import org.apache.commons.lang3.RandomStringUtils;

    public class RandomUtil {
        private static final int DEF_COUNT = 20;

        private RandomUtil() {
        }

        public static String generatePassword() {
            return RandomStringUtils.randomAlphanumeric(DEF_COUNT);
        }

        public static String generateActivationKey() {
            return RandomStringUtils.randomNumeric(DEF_COUNT);
        }

        public static String generateResetKey() {
            return RandomStringUtils.randomNumeric(DEF_COUNT);
        }

        public static String generateSeriesData() {
            return RandomStringUtils.randomAlphanumeric(DEF_COUNT);
        }

        public static String generateTokenData() {
            return RandomStringUtils.randomAlphanumeric(DEF_COUNT);
        }
    }
"};

#[test]
fn test_commons_lang2_utility_class() {
    assert_eq!(
        fix(LANG2_UTILITY),
        indoc! {"
            package au.com.suncorp.easyshare.services.util;
            import org.apache.commons.lang.RandomStringUtils;

            import java.security.SecureRandom;
            public final class RandomUtil {
                private static final SecureRandom SECURE_RANDOM = new SecureRandom();
                private static final int DEF_COUNT = 20;

                static {
                    SECURE_RANDOM.nextBytes(new byte[64]);
                }

                private RandomUtil() {
                }
                public static String generateString(int count) {
                    return generateRandomAlphanumericString();
                }

                private static String generateRandomAlphanumericString() {
                    return RandomStringUtils.random(DEF_COUNT, 0, 0, true, true, null, SECURE_RANDOM);
                }
            }
        "}
    );
}

#[test]
fn test_commons_lang3_reuses_existing_constant() {
    let outcome = transform(LANG3_KEYS);
    assert_eq!(outcome.state, TransformState::Done);
    assert_eq!(outcome.calls_rewritten(), 5);
    assert_eq!(outcome.members_added, 3);
    assert!(outcome.diagnostics.is_empty());
    assert_eq!(
        outcome.unit.print(),
        indoc! {"
            package io.moderne.service.util;

            import org.apache.commons.lang3.RandomStringUtils;

            import java.security.SecureRandom;

            public class RandomUtil {
                private static final SecureRandom SECURE_RANDOM = new SecureRandom();
                private static final int DEF_COUNT = 20;

                static {
                    SECURE_RANDOM.nextBytes(new byte[64]);
                }

                private RandomUtil() {
                }

                public static String generatePassword() {
                    return generateRandomAlphanumericString();
                }

                public static String generateActivationKey() {
                    return generateRandomAlphanumericString();
                }

                public static String generateResetKey() {
                    return generateRandomAlphanumericString();
                }

                public static String generateSeriesData() {
                    return generateRandomAlphanumericString();
                }

                public static String generateTokenData() {
                    return generateRandomAlphanumericString();
                }

                private static String generateRandomAlphanumericString() {
                    return RandomStringUtils.random(DEF_COUNT, 0, 0, true, true, null, SECURE_RANDOM);
                }
            }
        "}
    );
}

#[test]
fn test_second_pass_changes_nothing() {
    for source in [LANG2_UTILITY, LANG3_KEYS] {
        let once = fix(source);
        let outcome = transform(&once);
        assert_eq!(outcome.state, TransformState::Skipped);
        assert_eq!(outcome.unit.print(), once);
    }
}

#[test]
fn test_members_are_synthesized_once_per_type() {
    let out = fix(LANG3_KEYS);
    assert_eq!(out.matches("new SecureRandom()").count(), 1);
    assert_eq!(out.matches("static {").count(), 1);
    assert_eq!(out.matches("int DEF_COUNT").count(), 1);
    assert_eq!(
        out.matches("String generateRandomAlphanumericString() {").count(),
        1
    );
    assert_eq!(out.matches("RandomStringUtils.random").count(), 1);
}

#[test]
fn test_conflicting_type_keeps_its_calls() {
    let outcome = transform(indoc! {"
        import org.apache.commons.lang3.RandomStringUtils;

        class Legacy {
            private static final long SECURE_RANDOM = 7L;

            String id() {
                return RandomStringUtils.randomNumeric(6);
            }
        }

        class Fresh {
            String id() {
                return RandomStringUtils.randomNumeric(6);
            }
        }
    "});
    let out = outcome.unit.print();

    assert!(out.contains("private static final long SECURE_RANDOM = 7L;"));
    assert_eq!(out.matches("return RandomStringUtils.randomNumeric(6);").count(), 1);
    assert_eq!(out.matches("return generateRandomAlphanumericString();").count(), 1);
    assert_eq!(out.matches("new SecureRandom()").count(), 1);

    let conflicts: Vec<_> = outcome
        .diagnostics
        .iter()
        .filter(|d| d.kind == DiagnosticKind::NameConflict)
        .collect();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].type_name.as_deref(), Some("Legacy"));
    assert!(conflicts[0].message.contains("SECURE_RANDOM"));
}

#[test]
fn test_bound_simple_name_is_an_import_conflict() {
    let outcome = transform(indoc! {"
        import com.acme.crypto.SecureRandom;
        import org.apache.commons.lang3.RandomStringUtils;

        class Tokens {
            String next() {
                return RandomStringUtils.randomAscii(12);
            }
        }
    "});
    let out = outcome.unit.print();

    assert!(out.contains("return generateRandomAlphanumericString();"));
    assert!(!out.contains("import java.security.SecureRandom;"));
    assert!(outcome.imports_added.is_empty());
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::ImportConflict);
    assert!(outcome.diagnostics[0].message.contains("com.acme.crypto.SecureRandom"));
}

#[test]
fn test_static_import_call_site() {
    let out = fix(indoc! {"
        import static org.apache.commons.lang3.RandomStringUtils.randomNumeric;

        class Pins {
            String pin() {
                return randomNumeric(6);
            }
        }
    "});
    assert!(out.contains("return generateRandomAlphanumericString();"));
    assert!(out.contains("import java.security.SecureRandom;"));
    assert!(out.contains("import org.apache.commons.lang3.RandomStringUtils;"));
}

#[test]
fn test_own_method_shadows_static_import() {
    let source = indoc! {"
        import static org.apache.commons.lang3.RandomStringUtils.randomNumeric;

        class Pins {
            static String randomNumeric(int n) {
                return \"0\".repeat(n);
            }

            String pin() {
                return randomNumeric(6);
            }
        }
    "};
    let outcome = transform(source);
    assert!(!outcome.changed);
    assert_eq!(outcome.unit.print(), source);
}

#[test]
fn test_fully_qualified_call_site() {
    let out = fix(indoc! {"
        package app;

        class Salt {
            String salt() {
                return org.apache.commons.lang3.RandomStringUtils.randomAlphabetic(5);
            }
        }
    "});
    assert_eq!(
        out,
        indoc! {"
            package app;

            import java.security.SecureRandom;

            import org.apache.commons.lang3.RandomStringUtils;

            class Salt {
                private static final SecureRandom SECURE_RANDOM = new SecureRandom();
                private static final int DEF_COUNT = 20;

                static {
                    SECURE_RANDOM.nextBytes(new byte[64]);
                }

                String salt() {
                    return generateRandomAlphanumericString();
                }

                private static String generateRandomAlphanumericString() {
                    return RandomStringUtils.random(DEF_COUNT, 0, 0, true, true, null, SECURE_RANDOM);
                }
            }
        "}
    );
}

#[test]
fn test_unsupported_overloads_are_left_alone() {
    let source = indoc! {"
        import org.apache.commons.lang.RandomStringUtils;

        class Codes {
            String a() {
                return RandomStringUtils.randomNumeric(4, 8);
            }

            String b() {
                return RandomStringUtils.random(5, 'a', 'b');
            }
        }
    "};
    let outcome = transform(source);
    assert!(!outcome.changed);
    assert!(outcome.diagnostics.is_empty());
    assert_eq!(outcome.unit.print(), source);
}

#[test]
fn test_interface_default_method_is_reported() {
    let source = indoc! {"
        import org.apache.commons.lang3.RandomStringUtils;

        public interface TokenSource {
            default String token() {
                return RandomStringUtils.randomAlphanumeric(32);
            }
        }
    "};
    let outcome = transform(source);
    assert_eq!(outcome.unit.print(), source);
    assert_eq!(outcome.diagnostics.len(), 1);
    assert_eq!(outcome.diagnostics[0].kind, DiagnosticKind::UnsupportedHost);
    assert_eq!(outcome.diagnostics[0].type_name.as_deref(), Some("TokenSource"));
}

#[test]
fn test_random_utils_keeps_required_arguments() {
    let out = fix(indoc! {"
        import org.apache.commons.lang3.RandomUtils;

        class Noise {
            byte[] salt() {
                return RandomUtils.nextBytes(16);
            }

            long seed() {
                return RandomUtils.nextLong();
            }
        }
    "});
    assert!(out.contains("return generateSecureBytes(16);"));
    assert!(out.contains("return generateSecureLong();"));
    assert!(out.contains("private static byte[] generateSecureBytes(int count) {"));
    assert!(out.contains("private static long generateSecureLong() {"));
    // Helpers for calls that do not occur are not added.
    assert!(!out.contains("generateSecureIntInRange"));
    assert!(!out.contains("DEF_COUNT"));
}

#[test]
fn test_two_rules_share_generator_state() {
    let out = fix(indoc! {"
        import org.apache.commons.lang3.RandomStringUtils;
        import org.apache.commons.lang3.RandomUtils;

        class Mixed {
            String name() {
                return RandomStringUtils.randomAlphabetic(8);
            }

            int roll() {
                return RandomUtils.nextInt(1, 7);
            }
        }
    "});
    assert_eq!(out.matches("new SecureRandom()").count(), 1);
    assert_eq!(out.matches("static {").count(), 1);
    assert!(out.contains("return generateRandomAlphanumericString();"));
    assert!(out.contains("return generateSecureIntInRange(1, 7);"));
    assert_eq!(out.matches("import java.security.SecureRandom;").count(), 1);
}

#[test]
fn test_nested_type_gets_its_own_members() {
    let out = fix(indoc! {"
        import org.apache.commons.lang3.RandomStringUtils;

        class Outer {
            static class Inner {
                String id() {
                    return RandomStringUtils.randomNumeric(3);
                }
            }
        }
    "});
    assert!(out.contains(indoc! {"
        class Outer {
            static class Inner {
                private static final SecureRandom SECURE_RANDOM = new SecureRandom();
                private static final int DEF_COUNT = 20;
    "}));
    assert!(out.contains(indoc! {"
                private static String generateRandomAlphanumericString() {
                    return RandomStringUtils.random(DEF_COUNT, 0, 0, true, true, null, SECURE_RANDOM);
                }
            }
        }
    "}));
}

#[test]
fn test_untouched_code_is_byte_identical() {
    let odd = "    /* keep */ int   weird ( int a ,int b ){return a+b ;}  // trailing\n";
    let source = format!(
        "import org.apache.commons.lang3.RandomStringUtils;\n\nclass A {{\n{}\n    String s() {{ return RandomStringUtils.randomNumeric(2); }}\n}}\n",
        odd
    );
    let out = fix(&source);
    assert!(out.contains(odd));
    assert!(out.contains("String s() { return generateRandomAlphanumericString(); }"));
}

#[test]
fn test_crlf_sources_stay_crlf() {
    let source = "import org.apache.commons.lang3.RandomStringUtils;\r\n\r\nclass A {\r\n    String s() {\r\n        return RandomStringUtils.randomNumeric(2);\r\n    }\r\n}\r\n";
    let out = fix(source);
    assert!(out.contains("generateRandomAlphanumericString()"));
    assert_eq!(out.matches('\n').count(), out.matches("\r\n").count());
}
