mod access_code_test;
mod passkey_test;
